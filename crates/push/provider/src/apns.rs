//! APNs adapter using the a2 crate.

use a2::request::payload::PayloadLike;
use color_eyre::eyre::WrapErr as _;
use push_convert::{ApnsPayload, ApnsPushType, ApnsRequest, Notification};
use push_core::{DispatchError, ProviderKind, token_hash};
use push_worker::{Adapter, CancellationToken};

use crate::{ApnsAnswer, ApnsTransport};

/// APNs transport over an a2 HTTP/2 client.
pub struct A2Transport {
    client: a2::Client,
}

impl A2Transport {
    /// Create a transport from PKCS#12 certificate bytes and password.
    pub fn certificate(
        pkcs12_der: &[u8],
        password: &str,
        endpoint: a2::Endpoint,
    ) -> color_eyre::eyre::Result<Self> {
        let mut cursor = std::io::Cursor::new(pkcs12_der);
        let config = a2::ClientConfig::new(endpoint);

        let client = a2::Client::certificate(&mut cursor, password, config)
            .wrap_err("failed to create APNs client")?;

        Ok(Self { client })
    }

    /// Create a transport from a PKCS#8 signing key (token authentication).
    pub fn token(
        pkcs8_pem: &[u8],
        key_id: &str,
        team_id: &str,
        endpoint: a2::Endpoint,
    ) -> color_eyre::eyre::Result<Self> {
        let mut cursor = std::io::Cursor::new(pkcs8_pem);
        let config = a2::ClientConfig::new(endpoint);

        let client = a2::Client::token(&mut cursor, key_id, team_id, config)
            .wrap_err("failed to create APNs token client")?;

        Ok(Self { client })
    }
}

impl ApnsTransport for A2Transport {
    async fn send(&self, req: &ApnsRequest) -> Result<ApnsAnswer, DispatchError> {
        let payload = wire_payload(req)?;

        match self.client.send(payload).await {
            Ok(response) => Ok(ApnsAnswer {
                status: response.code,
                reason: String::new(),
                apns_id: response.apns_id,
            }),
            Err(a2::Error::ResponseError(response)) => Ok(ApnsAnswer {
                status: response.code,
                reason: response
                    .error
                    .map(|body| format!("{:?}", body.reason))
                    .unwrap_or_default(),
                apns_id: response.apns_id,
            }),
            Err(e) => Err(DispatchError::Transport(e.to_string())),
        }
    }
}

/// Converted APNs payload as it goes on the wire.
///
/// Serializes exactly the canonical payload built by the converter; a2 only
/// contributes the request headers.
#[derive(Debug)]
pub struct WirePayload<'a> {
    payload: &'a ApnsPayload,
    device_token: &'a str,
    options: a2::NotificationOptions<'a>,
}

impl serde::Serialize for WirePayload<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde::Serialize::serialize(self.payload, serializer)
    }
}

impl PayloadLike for WirePayload<'_> {
    fn get_device_token(&self) -> &str {
        self.device_token
    }

    fn get_options(&self) -> &a2::NotificationOptions<'_> {
        &self.options
    }
}

/// Pair a converted request with its a2 request options.
pub fn wire_payload(req: &ApnsRequest) -> Result<WirePayload<'_>, DispatchError> {
    let Some(payload) = &req.payload else {
        return Err(DispatchError::Encoding("empty notification".to_string()));
    };

    let collapse_id = req
        .headers
        .collapse_id
        .as_deref()
        .map(a2::CollapseId::new)
        .transpose()
        .map_err(|e| DispatchError::Encoding(e.to_string()))?;

    let options = a2::NotificationOptions {
        apns_topic: req.headers.topic.as_deref(),
        apns_collapse_id: collapse_id,
        apns_expiration: req
            .headers
            .expiration
            .map(|t| u64::try_from(t.timestamp()).unwrap_or(0)),
        apns_priority: Some(match req.headers.push_type.priority() {
            10 => a2::Priority::High,
            _ => a2::Priority::Normal,
        }),
        apns_push_type: Some(match req.headers.push_type {
            ApnsPushType::Alert => a2::PushType::Alert,
            ApnsPushType::Background => a2::PushType::Background,
            ApnsPushType::Voip => a2::PushType::Voip,
        }),
        ..Default::default()
    };

    Ok(WirePayload {
        payload,
        device_token: &req.token,
        options,
    })
}

/// Engine adapter for APNs.
pub struct ApnsAdapter<T> {
    transport: T,
}

impl<T> ApnsAdapter<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }
}

impl<T: ApnsTransport> Adapter for ApnsAdapter<T> {
    fn new_notification(&self) -> Notification {
        Notification::empty(ProviderKind::Apns)
    }

    async fn send_one(
        &self,
        ctx: &CancellationToken,
        token: &str,
        notification: &mut Notification,
    ) -> Result<(), DispatchError> {
        let req = notification.as_apns_mut()?;

        if req.is_empty() {
            tracing::debug!(token_hash = %token_hash(token), "nothing to send");
            return Ok(());
        }

        req.token = token.to_string();

        let answer = tokio::select! {
            biased;
            () = ctx.cancelled() => return Err(DispatchError::Cancelled),
            answer = self.transport.send(&*req) => answer?,
        };

        if answer.status != 200 {
            return Err(DispatchError::send_failure(answer.status, answer.reason));
        }

        tracing::debug!(
            token_hash = %token_hash(token),
            apns_id = answer.apns_id.as_deref().unwrap_or_default(),
            "accepted by APNs"
        );

        Ok(())
    }
}
