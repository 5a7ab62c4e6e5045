//! FCM notification types.

use std::collections::BTreeMap;

/// Default FCM `time_to_live`, matching the APNs default expiration.
pub const DEFAULT_TIME_TO_LIVE: u32 = 20 * 60;

/// FCM request. The message's `to` field is set per device by the adapter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FcmRequest {
    /// `None` when there is nothing to send.
    pub message: Option<FcmMessage>,
}

impl FcmRequest {
    /// Whether conversion produced nothing to send.
    pub fn is_empty(&self) -> bool {
        self.message.is_none()
    }

    /// Reset to the "nothing to send" state.
    pub fn clear(&mut self) {
        self.message = None;
    }
}

/// Legacy FCM HTTP message.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct FcmMessage {
    pub to: String,
    pub priority: FcmPriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapse_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_live: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mutable_content: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<FcmNotification>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

/// Delivery priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FcmPriority {
    #[default]
    Normal,
    High,
}

/// Display part of an FCM message.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct FcmNotification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_loc_key: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub title_loc_args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_loc_key: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub body_loc_args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
}

impl FcmMessage {
    /// Insert a data field.
    pub fn data(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.data.insert(key.to_string(), value.into());
        self
    }
}
