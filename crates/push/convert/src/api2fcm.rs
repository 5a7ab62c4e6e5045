//! Generic API body to FCM conversion.

use base64::Engine as _;
use push_core::{
    AlertText, AlertingPush, Capabilities, DispatchError, EncryptedPush, ProviderKind, PushBody,
    PushKind,
};
use serde_json::Value;

use crate::voip::{require_voip, voip_fields};
use crate::{
    Converter, DEFAULT_TIME_TO_LIVE, FcmMessage, FcmNotification, FcmPriority, Notification,
};

/// Converts structured API bodies into FCM messages.
///
/// Follows the APNs mapping: alerts go to the `notification` block, everything
/// else to string-valued `data`.
#[derive(Debug, Clone)]
pub struct ApiFcmConverter {
    caps: Capabilities,
}

impl ApiFcmConverter {
    /// Create a converter bound to a credential's capabilities.
    pub fn new(caps: Capabilities) -> Self {
        Self { caps }
    }
}

impl Converter for ApiFcmConverter {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Fcm
    }

    fn convert(&self, body: &PushBody, out: &mut Notification) -> Result<(), DispatchError> {
        let out = out.as_fcm_mut()?;
        let mut message = FcmMessage {
            time_to_live: Some(DEFAULT_TIME_TO_LIVE),
            ..Default::default()
        };

        match &body.kind {
            Some(PushKind::Voip(voip)) => {
                require_voip(self.caps.supports_voip)?;
                for (key, value) in voip_fields(voip) {
                    message.data(key, data_string(value));
                }
                message.priority = FcmPriority::High;
            }
            Some(PushKind::Alerting(alerting)) => {
                if self.caps.allow_alerts {
                    message.notification = Some(notification(alerting, self.caps.sound()));
                    message.mutable_content = Some(true);
                    if let Some(category) = &alerting.category {
                        message.data("category", category.as_str());
                    }
                } else {
                    tracing::debug!("alerts not allowed, degrading to data message");
                    if let Some(badge) = alerting.badge() {
                        message.data("badge", badge.to_string());
                    }
                    message.content_available = Some(true);
                }
                message.priority = FcmPriority::High;
            }
            Some(PushKind::Encrypted(encrypted)) => {
                set_encrypted(&mut message, encrypted, self.caps.sound())?;
            }
            Some(PushKind::Silent) => {
                out.clear();
                return Ok(());
            }
            None => return Err(DispatchError::UnknownMessageKind),
        }

        if body.seq > 0 {
            message.data("seq", body.seq.to_string());
        }

        message.collapse_key = body
            .collapse_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| self.caps.collapse_key.clone().filter(|key| !key.is_empty()));

        out.message = Some(message);
        Ok(())
    }
}

fn set_encrypted(
    message: &mut FcmMessage,
    src: &EncryptedPush,
    sound: Option<&str>,
) -> Result<(), DispatchError> {
    if let Some(public) = &src.public_alerting_push {
        message.notification = Some(notification(public, sound));
    }

    if src.encrypted_data.is_empty() {
        return Err(DispatchError::EmptyEncryptedPayload);
    }

    message.data("nonce", src.nonce.to_string());
    message.data(
        "encrypted_data",
        base64::engine::general_purpose::STANDARD.encode(&src.encrypted_data),
    );
    message.mutable_content = Some(true);
    message.priority = FcmPriority::High;

    Ok(())
}

fn notification(src: &AlertingPush, sound: Option<&str>) -> FcmNotification {
    let mut out = FcmNotification::default();

    match &src.title {
        Some(AlertText::Localized { loc_key, loc_args }) => {
            out.title_loc_key = Some(loc_key.clone());
            out.title_loc_args = loc_args.clone();
        }
        Some(AlertText::Plain(title)) if !title.is_empty() => out.title = Some(title.clone()),
        _ => {}
    }

    match &src.body {
        Some(AlertText::Localized { loc_key, loc_args }) => {
            out.body_loc_key = Some(loc_key.clone());
            out.body_loc_args = loc_args.clone();
        }
        Some(AlertText::Plain(body)) if !body.is_empty() => out.body = Some(body.clone()),
        _ => {}
    }

    out.sound = sound.map(str::to_string);
    out.badge = src.badge().map(|b| b.to_string());
    out
}

/// FCM data values are strings; nested values are sent as JSON text.
fn data_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
