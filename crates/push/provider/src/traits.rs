//! Provider transport traits.

use push_convert::{ApnsRequest, FcmMessage};
use push_core::DispatchError;

/// Raw answer from APNs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApnsAnswer {
    /// HTTP status code.
    pub status: u16,
    /// APNs error reason, empty on success.
    pub reason: String,
    /// `apns-id` assigned to the notification.
    pub apns_id: Option<String>,
}

/// Sends one APNs request. Errors are transport failures only.
#[trait_variant::make(Send)]
pub trait ApnsTransport: Send + Sync {
    async fn send(&self, req: &ApnsRequest) -> Result<ApnsAnswer, DispatchError>;
}

/// Raw answer from FCM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FcmAnswer {
    /// HTTP status code.
    pub status: u16,
    /// Status reason for non-success answers.
    pub reason: String,
    /// Decoded body of a successful answer.
    pub body: Option<FcmResponse>,
}

/// FCM legacy HTTP response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct FcmResponse {
    pub multicast_id: i64,
    pub success: u32,
    pub failure: u32,
    pub canonical_ids: u32,
    pub results: Vec<FcmResult>,
}

/// Per-token result in an FCM response.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct FcmResult {
    pub message_id: Option<String>,
    /// Replacement token the sender should use from now on.
    pub registration_id: Option<String>,
    pub error: Option<String>,
}

/// Sends one FCM message. Errors are transport failures only.
#[trait_variant::make(Send)]
pub trait FcmTransport: Send + Sync {
    async fn send(&self, message: &FcmMessage) -> Result<FcmAnswer, DispatchError>;
}
