//! Dispatch error taxonomy.

use crate::ProviderKind;

/// Every failure the dispatch path can report on a [`crate::Response`].
///
/// Cloneable so a single conversion failure can be attached to the response
/// of every device in the request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The request carried no device tokens.
    #[error("empty device token")]
    InvalidDeviceToken,

    /// The push body had no variant set.
    #[error("unknown message kind")]
    UnknownMessageKind,

    /// The credential cannot deliver this kind of push.
    #[error("unsupported capability: {0}")]
    UnsupportedCapability(String),

    /// Encrypted push without encrypted data.
    #[error("empty encrypted payload")]
    EmptyEncryptedPayload,

    /// The provider answered with a non-success status.
    #[error("{status} {reason}")]
    SendFailure {
        /// Provider status code.
        status: u16,
        /// Provider reason text.
        reason: String,
    },

    /// Network or TLS failure talking to the provider.
    #[error("transport error: {0}")]
    Transport(String),

    /// The notification object does not belong to this provider.
    #[error("invalid output type: expected {expected}, got {actual}")]
    InvalidOutputType {
        /// Provider the component was built for.
        expected: ProviderKind,
        /// Provider of the object it received.
        actual: ProviderKind,
    },

    /// The notification could not be encoded.
    #[error("payload encoding failed: {0}")]
    Encoding(String),

    /// The worker no longer accepts requests.
    #[error("worker is shut down")]
    Shutdown,

    /// The send was abandoned because the caller cancelled.
    #[error("send cancelled")]
    Cancelled,
}

impl DispatchError {
    /// Build a [`DispatchError::SendFailure`].
    pub fn send_failure(status: u16, reason: impl Into<String>) -> Self {
        Self::SendFailure {
            status,
            reason: reason.into(),
        }
    }
}
