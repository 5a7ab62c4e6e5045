//! HTTP endpoints for submitting pushes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use push_core::PushBody;

use crate::registry::Dispatch;

/// Create the push API router.
pub fn push_router<D>(dispatch: D) -> Router
where
    D: Dispatch + Clone + 'static,
{
    Router::new()
        .route("/v1/push/{project_id}", post(push_handler::<D>))
        .route("/health", get(health))
        .with_state(dispatch)
}

/// Push request.
#[derive(Debug, Deserialize, Serialize)]
pub struct PushRequest {
    pub devices: Vec<String>,
    pub body: PushBody,
}

/// Outcome for one device.
#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct DeviceResult {
    pub device_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<push_core::Response> for DeviceResult {
    fn from(resp: push_core::Response) -> Self {
        Self {
            device_token: resp.device_token,
            error: resp.error.map(|e| e.to_string()),
        }
    }
}

/// Send a push to every listed device of a project.
pub async fn push_handler<D>(
    State(dispatch): State<D>,
    Path(project_id): Path<String>,
    Json(request): Json<PushRequest>,
) -> Response
where
    D: Dispatch,
{
    tracing::info!(
        project_id = %project_id,
        devices = request.devices.len(),
        "push request"
    );

    match dispatch
        .dispatch(&project_id, request.devices, request.body)
        .await
    {
        Some(responses) => {
            let failed = responses.iter().filter(|r| !r.is_success()).count();
            if failed > 0 {
                tracing::warn!(project_id = %project_id, failed, "push finished with failures");
            }
            let results: Vec<DeviceResult> = responses.into_iter().map(Into::into).collect();
            (StatusCode::OK, Json(results)).into_response()
        }
        None => {
            tracing::warn!(project_id = %project_id, "unknown project");
            (StatusCode::NOT_FOUND, "unknown project").into_response()
        }
    }
}

async fn health() -> &'static str {
    "ok"
}
