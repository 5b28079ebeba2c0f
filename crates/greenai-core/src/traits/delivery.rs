//! Offline delivery channel (push notifications).

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::id::UserId;
use crate::types::notification::NotificationEnvelope;

/// Delivers a notification to a user with no live connections.
///
/// Delivery is best effort: callers log a returned error and carry on.
#[async_trait]
pub trait OfflineDelivery: Send + Sync + std::fmt::Debug + 'static {
    /// Pushes the envelope to the user's devices.
    async fn push_notify(&self, user_id: UserId, envelope: &NotificationEnvelope) -> AppResult<()>;
}
