//! Push Conversion
//!
//! Turns a generic [`push_core::PushBody`] into a provider notification.

mod api2apns;
mod api2fcm;
mod apns;
mod binary;
mod converter;
mod fcm;
mod notification;
mod voip;

pub use api2apns::ApiApnsConverter;
pub use api2fcm::ApiFcmConverter;
pub use apns::*;
pub use binary::BinaryApnsConverter;
pub use converter::*;
pub use fcm::*;
pub use notification::*;
pub use voip::peer_type_code;
