//! Push Providers
//!
//! Adapters that deliver converted notifications over APNs and FCM.

mod apns;
mod fcm;
mod traits;

pub use apns::*;
pub use fcm::*;
pub use traits::*;

pub use a2::Endpoint as ApnsEndpoint;
