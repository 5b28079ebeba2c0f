//! Offline delivery that only records the push in the log.
//!
//! Stands in for a device push provider when none is configured.

use async_trait::async_trait;
use tracing::info;

use greenai_core::result::AppResult;
use greenai_core::traits::OfflineDelivery;
use greenai_core::types::{NotificationEnvelope, UserId};

/// Logs each push request and reports success.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingPushDelivery;

#[async_trait]
impl OfflineDelivery for LoggingPushDelivery {
    async fn push_notify(&self, user_id: UserId, envelope: &NotificationEnvelope) -> AppResult<()> {
        info!(
            user_id = %user_id,
            notification_id = %envelope.id,
            kind = envelope.kind.as_str(),
            title = %envelope.title,
            "Push notification queued"
        );
        Ok(())
    }
}
