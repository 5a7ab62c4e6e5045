//! Converter trait and factory.

use std::sync::Arc;

use push_core::{Capabilities, DispatchError, ProviderKind, PushBody};

use crate::{ApiApnsConverter, ApiFcmConverter, BinaryApnsConverter, Notification};

/// Stateless transformation of a generic body into a provider notification.
///
/// Called concurrently from many dispatch tasks.
pub trait Converter: Send + Sync {
    /// Provider whose notifications this converter fills.
    fn provider(&self) -> ProviderKind;

    /// Populate `out` from `body`.
    ///
    /// Leaves `out` empty, without error, when there is nothing to send.
    fn convert(&self, body: &PushBody, out: &mut Notification) -> Result<(), DispatchError>;
}

/// Message framing a worker expects from its callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConverterKind {
    /// Structured generic API bodies.
    #[default]
    Api,
    /// Opaque bodies forwarded as a blob.
    Binary,
}

/// Build the converter for a provider.
pub fn new_converter(
    kind: ConverterKind,
    provider: ProviderKind,
    caps: Capabilities,
) -> Result<Arc<dyn Converter>, DispatchError> {
    match (kind, provider) {
        (ConverterKind::Api, ProviderKind::Apns) => Ok(Arc::new(ApiApnsConverter::new(caps))),
        (ConverterKind::Api, ProviderKind::Fcm) => Ok(Arc::new(ApiFcmConverter::new(caps))),
        (ConverterKind::Binary, ProviderKind::Apns) => {
            Ok(Arc::new(BinaryApnsConverter::new(caps)))
        }
        (ConverterKind::Binary, ProviderKind::Fcm) => Err(DispatchError::InvalidOutputType {
            expected: ProviderKind::Apns,
            actual: ProviderKind::Fcm,
        }),
    }
}
