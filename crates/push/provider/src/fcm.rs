//! FCM adapter over the legacy HTTP API.

use color_eyre::eyre::WrapErr as _;
use push_convert::{FcmMessage, Notification};
use push_core::{DispatchError, ProviderKind, token_hash};
use push_worker::{Adapter, CancellationToken};

use crate::{FcmAnswer, FcmResponse, FcmTransport};

/// Legacy FCM HTTP endpoint.
pub const FCM_ENDPOINT: &str = "https://fcm.googleapis.com/fcm/send";

/// FCM transport over reqwest.
pub struct HttpFcmTransport {
    client: reqwest::Client,
    endpoint: String,
    server_key: String,
}

impl HttpFcmTransport {
    /// Create a transport with an explicit request timeout.
    pub fn new(
        endpoint: impl Into<String>,
        server_key: impl Into<String>,
        timeout: std::time::Duration,
    ) -> color_eyre::eyre::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .wrap_err("failed to create FCM client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            server_key: server_key.into(),
        })
    }
}

impl FcmTransport for HttpFcmTransport {
    async fn send(&self, message: &FcmMessage) -> Result<FcmAnswer, DispatchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("key={}", self.server_key),
            )
            .json(message)
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Ok(FcmAnswer {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
                body: None,
            });
        }

        let body = response
            .json::<FcmResponse>()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        Ok(FcmAnswer {
            status: status.as_u16(),
            reason: String::new(),
            body: Some(body),
        })
    }
}

/// Translate an FCM answer into a per-device outcome.
pub fn interpret(answer: FcmAnswer) -> Result<(), DispatchError> {
    if answer.status != 200 {
        return Err(DispatchError::send_failure(answer.status, answer.reason));
    }

    let result = answer.body.and_then(|body| body.results.into_iter().next());
    match result.and_then(|r| r.error) {
        Some(error) => Err(DispatchError::send_failure(answer.status, error)),
        None => Ok(()),
    }
}

/// Engine adapter for FCM.
pub struct FcmAdapter<T> {
    transport: T,
}

impl<T> FcmAdapter<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }
}

impl<T: FcmTransport> Adapter for FcmAdapter<T> {
    fn new_notification(&self) -> Notification {
        Notification::empty(ProviderKind::Fcm)
    }

    async fn send_one(
        &self,
        ctx: &CancellationToken,
        token: &str,
        notification: &mut Notification,
    ) -> Result<(), DispatchError> {
        let req = notification.as_fcm_mut()?;

        let Some(message) = req.message.as_mut() else {
            tracing::debug!(token_hash = %token_hash(token), "nothing to send");
            return Ok(());
        };

        message.to = token.to_string();

        let answer = tokio::select! {
            biased;
            () = ctx.cancelled() => return Err(DispatchError::Cancelled),
            answer = self.transport.send(&*message) => answer?,
        };

        if let Some(canonical) = answer
            .body
            .as_ref()
            .and_then(|body| body.results.first())
            .and_then(|r| r.registration_id.as_deref())
        {
            tracing::warn!(
                token_hash = %token_hash(token),
                canonical_hash = %token_hash(canonical),
                "FCM returned a canonical token"
            );
        }

        interpret(answer)
    }
}
