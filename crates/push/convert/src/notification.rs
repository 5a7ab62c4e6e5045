//! Provider notification union.

use push_core::{DispatchError, ProviderKind};

use crate::{ApnsRequest, FcmRequest};

/// A converted notification, keyed by provider.
///
/// Built once per request and reused for every device; only the destination
/// token changes between sends. Must never be handed to two sends at once.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Apns(ApnsRequest),
    Fcm(FcmRequest),
}

impl Notification {
    /// Empty notification for a provider.
    pub fn empty(provider: ProviderKind) -> Self {
        match provider {
            ProviderKind::Apns => Self::Apns(ApnsRequest::default()),
            ProviderKind::Fcm => Self::Fcm(FcmRequest::default()),
        }
    }

    /// Provider this notification targets.
    pub fn provider(&self) -> ProviderKind {
        match self {
            Self::Apns(_) => ProviderKind::Apns,
            Self::Fcm(_) => ProviderKind::Fcm,
        }
    }

    /// Whether conversion left nothing to send.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Apns(req) => req.is_empty(),
            Self::Fcm(req) => req.is_empty(),
        }
    }

    /// Borrow as an APNs request.
    pub fn as_apns_mut(&mut self) -> Result<&mut ApnsRequest, DispatchError> {
        match self {
            Self::Apns(req) => Ok(req),
            Self::Fcm(_) => Err(DispatchError::InvalidOutputType {
                expected: ProviderKind::Apns,
                actual: ProviderKind::Fcm,
            }),
        }
    }

    /// Borrow as an FCM request.
    pub fn as_fcm_mut(&mut self) -> Result<&mut FcmRequest, DispatchError> {
        match self {
            Self::Fcm(req) => Ok(req),
            Self::Apns(_) => Err(DispatchError::InvalidOutputType {
                expected: ProviderKind::Fcm,
                actual: ProviderKind::Apns,
            }),
        }
    }
}
