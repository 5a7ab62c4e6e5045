//! Generic API body to APNs conversion.

use base64::Engine as _;
use push_core::{
    AlertText, AlertingPush, Capabilities, DispatchError, EncryptedPush, ProviderKind, PushBody,
    PushKind, VoipPush,
};
use serde_json::json;

use crate::voip::{require_voip, voip_fields};
use crate::{ApnsPayload, ApnsPushType, Converter, Notification};

/// Converts structured API bodies into APNs requests.
#[derive(Debug, Clone)]
pub struct ApiApnsConverter {
    caps: Capabilities,
}

impl ApiApnsConverter {
    /// Create a converter bound to a credential's capabilities.
    pub fn new(caps: Capabilities) -> Self {
        Self { caps }
    }
}

impl Converter for ApiApnsConverter {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Apns
    }

    fn convert(&self, body: &PushBody, out: &mut Notification) -> Result<(), DispatchError> {
        let out = out.as_apns_mut()?;
        let mut payload = ApnsPayload::default();

        let push_type = match &body.kind {
            Some(PushKind::Voip(voip)) => {
                set_voip(&mut payload, voip, self.caps.supports_voip)?;
                ApnsPushType::Voip
            }
            Some(PushKind::Alerting(alerting)) => {
                set_alerting(&mut payload, alerting, self.caps.sound(), self.caps.allow_alerts)
            }
            Some(PushKind::Encrypted(encrypted)) => {
                set_encrypted(&mut payload, encrypted, self.caps.sound())?
            }
            Some(PushKind::Silent) => {
                out.clear();
                return Ok(());
            }
            None => return Err(DispatchError::UnknownMessageKind),
        };

        if body.seq > 0 {
            payload.custom("seq", body.seq);
        }

        let collapse_id = body
            .collapse_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .or(self.caps.collapse_key.as_deref());

        out.seal(payload, push_type, collapse_id, self.caps.topic())
    }
}

fn set_voip(
    payload: &mut ApnsPayload,
    src: &VoipPush,
    supports_voip: bool,
) -> Result<(), DispatchError> {
    require_voip(supports_voip)?;

    for (key, value) in voip_fields(src) {
        payload.custom(key, value);
    }

    Ok(())
}

fn set_alerting(
    payload: &mut ApnsPayload,
    src: &AlertingPush,
    sound: Option<&str>,
    allow_alerts: bool,
) -> ApnsPushType {
    if allow_alerts {
        set_alert_props(payload, src, sound);
        payload.mutable_content();

        if let Some(category) = &src.category {
            payload.custom("category", category.as_str());
        }

        ApnsPushType::Alert
    } else {
        tracing::debug!("alerts not allowed, degrading to background push");
        if let Some(badge) = src.badge() {
            payload.badge(badge);
        }

        payload.content_available();
        payload.sound("");

        ApnsPushType::Background
    }
}

fn set_encrypted(
    payload: &mut ApnsPayload,
    src: &EncryptedPush,
    sound: Option<&str>,
) -> Result<ApnsPushType, DispatchError> {
    let push_type = match &src.public_alerting_push {
        Some(public) => {
            set_alert_props(payload, public, sound);
            ApnsPushType::Alert
        }
        None => ApnsPushType::Background,
    };

    if src.encrypted_data.is_empty() {
        return Err(DispatchError::EmptyEncryptedPayload);
    }

    payload.mutable_content();
    payload.custom(
        "user_info",
        json!({
            "nonce": src.nonce.to_string(),
            "encrypted_data": base64::engine::general_purpose::STANDARD.encode(&src.encrypted_data),
        }),
    );

    Ok(push_type)
}

fn set_alert_props(payload: &mut ApnsPayload, src: &AlertingPush, sound: Option<&str>) {
    match &src.title {
        Some(AlertText::Localized { loc_key, loc_args }) => {
            payload.alert_title_loc(loc_key, loc_args);
        }
        Some(AlertText::Plain(title)) if !title.is_empty() => {
            payload.alert_title(title);
        }
        _ => {}
    }

    match &src.body {
        Some(AlertText::Localized { loc_key, loc_args }) => {
            payload.alert_loc(loc_key, loc_args);
        }
        Some(AlertText::Plain(body)) if !body.is_empty() => {
            payload.alert_body(body);
        }
        _ => {}
    }

    if let Some(sound) = sound {
        payload.sound(sound);
    }

    if let Some(badge) = src.badge() {
        payload.badge(badge);
    }
}
