//! APNs notification types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use push_core::DispatchError;
use serde_json::Value;

/// How long APNs keeps retrying an undelivered notification by default.
pub const DEFAULT_EXPIRATION: chrono::Duration = chrono::Duration::minutes(20);

/// APNs request: headers plus the encoded payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApnsRequest {
    /// Destination device token. Set per device by the adapter.
    pub token: String,
    /// Request headers.
    pub headers: ApnsHeaders,
    /// Structured payload. `None` when there is nothing to send.
    pub payload: Option<ApnsPayload>,
    /// Canonical JSON encoding of `payload`.
    pub body: Vec<u8>,
}

/// APNs request headers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApnsHeaders {
    /// Expiration. Unset values are replaced by `now + 20m` on seal.
    pub expiration: Option<DateTime<Utc>>,
    /// `apns-collapse-id`.
    pub collapse_id: Option<String>,
    /// `apns-topic`.
    pub topic: Option<String>,
    /// `apns-push-type`.
    pub push_type: ApnsPushType,
}

/// `apns-push-type` header value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApnsPushType {
    #[default]
    Alert,
    Background,
    Voip,
}

impl ApnsPushType {
    /// `apns-priority` matching this push type.
    pub fn priority(self) -> u8 {
        match self {
            Self::Alert | Self::Voip => 10,
            Self::Background => 5,
        }
    }
}

impl ApnsHeaders {
    /// True when no expiration was supplied (zero after truncating to the hour).
    pub fn expiration_unset(&self) -> bool {
        self.expiration
            .is_none_or(|t| t.timestamp().div_euclid(3600) == 0)
    }
}

impl ApnsRequest {
    /// Whether conversion produced nothing to send.
    pub fn is_empty(&self) -> bool {
        self.payload.is_none()
    }

    /// Reset to the "nothing to send" state.
    pub fn clear(&mut self) {
        self.payload = None;
        self.body.clear();
    }

    /// Encode `payload` and fill in the headers.
    pub fn seal(
        &mut self,
        payload: ApnsPayload,
        push_type: ApnsPushType,
        collapse_id: Option<&str>,
        topic: Option<&str>,
    ) -> Result<(), DispatchError> {
        self.body =
            serde_json::to_vec(&payload).map_err(|e| DispatchError::Encoding(e.to_string()))?;
        self.payload = Some(payload);

        if self.headers.expiration_unset() {
            self.headers.expiration = Some(Utc::now() + DEFAULT_EXPIRATION);
        }
        if let Some(id) = collapse_id.filter(|id| !id.is_empty()) {
            self.headers.collapse_id = Some(id.to_string());
        }
        if let Some(topic) = topic.filter(|t| !t.is_empty()) {
            self.headers.topic = Some(topic.to_string());
        }
        self.headers.push_type = push_type;

        Ok(())
    }
}

/// APNs JSON payload: the `aps` dictionary plus custom top-level keys.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct ApnsPayload {
    pub aps: Aps,
    #[serde(flatten)]
    pub custom: BTreeMap<String, Value>,
}

/// The `aps` dictionary.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct Aps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<ApsAlert>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    #[serde(rename = "content-available", skip_serializing_if = "Option::is_none")]
    pub content_available: Option<u8>,
    #[serde(rename = "mutable-content", skip_serializing_if = "Option::is_none")]
    pub mutable_content: Option<u8>,
}

/// The `aps.alert` dictionary.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct ApsAlert {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "title-loc-key", skip_serializing_if = "Option::is_none")]
    pub title_loc_key: Option<String>,
    #[serde(rename = "title-loc-args", skip_serializing_if = "Vec::is_empty")]
    pub title_loc_args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(rename = "loc-key", skip_serializing_if = "Option::is_none")]
    pub loc_key: Option<String>,
    #[serde(rename = "loc-args", skip_serializing_if = "Vec::is_empty")]
    pub loc_args: Vec<String>,
}

impl ApnsPayload {
    fn alert(&mut self) -> &mut ApsAlert {
        self.aps.alert.get_or_insert_with(ApsAlert::default)
    }

    pub fn alert_title(&mut self, title: &str) -> &mut Self {
        self.alert().title = Some(title.to_string());
        self
    }

    pub fn alert_title_loc(&mut self, key: &str, args: &[String]) -> &mut Self {
        let alert = self.alert();
        alert.title_loc_key = Some(key.to_string());
        alert.title_loc_args = args.to_vec();
        self
    }

    pub fn alert_body(&mut self, body: &str) -> &mut Self {
        self.alert().body = Some(body.to_string());
        self
    }

    pub fn alert_loc(&mut self, key: &str, args: &[String]) -> &mut Self {
        let alert = self.alert();
        alert.loc_key = Some(key.to_string());
        alert.loc_args = args.to_vec();
        self
    }

    pub fn badge(&mut self, badge: u32) -> &mut Self {
        self.aps.badge = Some(badge);
        self
    }

    pub fn sound(&mut self, sound: &str) -> &mut Self {
        self.aps.sound = Some(sound.to_string());
        self
    }

    pub fn content_available(&mut self) -> &mut Self {
        self.aps.content_available = Some(1);
        self
    }

    pub fn mutable_content(&mut self) -> &mut Self {
        self.aps.mutable_content = Some(1);
        self
    }

    pub fn custom(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.custom.insert(key.to_string(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_encoding() {
        let mut payload = ApnsPayload::default();
        payload
            .alert_title("Hi")
            .badge(2)
            .mutable_content()
            .custom("seq", 5);

        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(
            json,
            r#"{"aps":{"alert":{"title":"Hi"},"badge":2,"mutable-content":1},"seq":5}"#
        );
    }

    #[test]
    fn test_empty_sound_is_encoded() {
        let mut payload = ApnsPayload::default();
        payload.content_available().sound("");

        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"aps":{"sound":"","content-available":1}}"#);
    }

    #[test]
    fn test_seal_defaults_expiration() {
        let mut req = ApnsRequest::default();
        let before = Utc::now();
        req.seal(ApnsPayload::default(), ApnsPushType::Alert, None, Some(""))
            .unwrap();

        let expiration = req.headers.expiration.unwrap();
        assert!(expiration >= before + DEFAULT_EXPIRATION);
        assert!(req.headers.topic.is_none());
        assert!(req.headers.collapse_id.is_none());
        assert_eq!(req.body, br#"{"aps":{}}"#);
    }

    #[test]
    fn test_seal_keeps_explicit_expiration() {
        let explicit = DateTime::from_timestamp(2_000_000_000, 0).unwrap();
        let mut req = ApnsRequest::default();
        req.headers.expiration = Some(explicit);
        req.seal(
            ApnsPayload::default(),
            ApnsPushType::Background,
            Some("thread-1"),
            Some("com.example.app"),
        )
        .unwrap();

        assert_eq!(req.headers.expiration, Some(explicit));
        assert_eq!(req.headers.collapse_id.as_deref(), Some("thread-1"));
        assert_eq!(req.headers.topic.as_deref(), Some("com.example.app"));
        assert_eq!(req.headers.push_type.priority(), 5);
    }

    #[test]
    fn test_near_epoch_expiration_is_unset() {
        let headers = ApnsHeaders {
            expiration: DateTime::from_timestamp(59 * 60, 0),
            ..Default::default()
        };
        assert!(headers.expiration_unset());
    }
}
