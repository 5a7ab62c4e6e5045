//! Opaque-body APNs conversion.

use base64::Engine as _;
use push_core::{Capabilities, DispatchError, ProviderKind, PushBody, PushKind};

use crate::{ApnsPayload, ApnsPushType, Converter, Notification};

/// Forwards the whole body as a base64 blob inside a background push.
///
/// Clients decode the blob themselves, so capability flags are not consulted.
#[derive(Debug, Clone)]
pub struct BinaryApnsConverter {
    caps: Capabilities,
}

impl BinaryApnsConverter {
    pub fn new(caps: Capabilities) -> Self {
        Self { caps }
    }
}

impl Converter for BinaryApnsConverter {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Apns
    }

    fn convert(&self, body: &PushBody, out: &mut Notification) -> Result<(), DispatchError> {
        let out = out.as_apns_mut()?;

        match &body.kind {
            None => return Err(DispatchError::UnknownMessageKind),
            Some(PushKind::Silent) => {
                out.clear();
                return Ok(());
            }
            Some(_) => {}
        }

        let encoded = serde_json::to_vec(body).map_err(|e| DispatchError::Encoding(e.to_string()))?;

        let mut payload = ApnsPayload::default();
        payload.content_available();
        payload.custom(
            "body",
            base64::engine::general_purpose::STANDARD.encode(encoded),
        );

        if body.seq > 0 {
            payload.custom("seq", body.seq);
        }

        let collapse_id = body
            .collapse_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .or(self.caps.collapse_key.as_deref());

        out.seal(payload, ApnsPushType::Background, collapse_id, self.caps.topic())
    }
}
