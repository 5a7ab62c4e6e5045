//! Dispatch request and per-device response.

use crate::{DispatchError, PushBody};

/// One dispatch unit: a payload fanned out to a list of devices.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Request {
    /// Routing and logging label.
    pub project_id: String,
    /// Device tokens, in delivery order. Duplicates are delivered twice.
    pub devices: Vec<String>,
    /// The generic body to convert.
    pub payload: PushBody,
}

impl Request {
    /// Create a new request.
    pub fn new(project_id: impl Into<String>, devices: Vec<String>, payload: PushBody) -> Self {
        Self {
            project_id: project_id.into(),
            devices,
            payload,
        }
    }
}

/// Outcome for one device, or for the whole request when it has no devices.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Project that handled the request.
    pub project_id: String,
    /// Device token. Empty for whole-request failures.
    pub device_token: String,
    /// Error, if delivery failed.
    pub error: Option<DispatchError>,
}

impl Response {
    /// Create a successful response.
    pub fn success(project_id: impl Into<String>, device_token: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            device_token: device_token.into(),
            error: None,
        }
    }

    /// Create a failed response.
    pub fn failure(
        project_id: impl Into<String>,
        device_token: impl Into<String>,
        error: DispatchError,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            device_token: device_token.into(),
            error: Some(error),
        }
    }

    /// Check if delivery succeeded.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
