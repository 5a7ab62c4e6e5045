//! Provider adapter trait.

use push_convert::Notification;
use push_core::DispatchError;
use tokio_util::sync::CancellationToken;

/// Binding between the engine and one push provider.
#[trait_variant::make(Send)]
pub trait Adapter: Send + Sync {
    /// Empty notification of this provider's type.
    fn new_notification(&self) -> Notification;

    /// Deliver an already-converted notification to one device.
    ///
    /// Sets the destination token on `notification` in place. Non-success
    /// provider answers map to [`DispatchError::SendFailure`].
    async fn send_one(
        &self,
        ctx: &CancellationToken,
        token: &str,
        notification: &mut Notification,
    ) -> Result<(), DispatchError>;
}
