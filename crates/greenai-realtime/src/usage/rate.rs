//! Transport-level rate limiting built on the usage limiter.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use greenai_core::config::InboundRateLimitConfig;
use greenai_core::error::AppError;
use greenai_core::result::AppResult;
use greenai_core::types::UserId;

use super::limiter::UsageLimiter;
use super::period::PeriodPolicy;
use super::plans::UniformPlanLookup;
use super::store::MemoryUsageStore;

/// Counter resource name for inbound socket events.
pub const SOCKET_EVENTS: &str = "socket_events";

/// Caps inbound events per user per fixed window.
#[derive(Debug, Clone)]
pub struct InboundRateLimiter {
    limiter: UsageLimiter,
    windows: Arc<MemoryUsageStore>,
    window: Duration,
    enabled: bool,
}

impl InboundRateLimiter {
    /// Creates a limiter from configuration.
    pub fn new(config: &InboundRateLimitConfig) -> Self {
        let plans = UniformPlanLookup::single("socket", SOCKET_EVENTS, config.max_events);
        let windows = Arc::new(MemoryUsageStore::new());
        Self {
            limiter: UsageLimiter::new(
                windows.clone(),
                Arc::new(plans),
                PeriodPolicy::FixedWindow(config.window_seconds),
            ),
            windows,
            window: Duration::from_secs(config.window_seconds.max(1)),
            enabled: config.enabled,
        }
    }

    /// Counts one event for the user, or refuses it with a `RateLimit` error.
    pub async fn admit(&self, user_id: UserId) -> AppResult<()> {
        if !self.enabled {
            return Ok(());
        }
        let check = self.limiter.check_limit(user_id, SOCKET_EVENTS).await;
        if !check.allowed {
            warn!(user_id = %user_id, current = check.current, "Inbound event rate limited");
            return Err(AppError::rate_limit("Too many events, slow down"));
        }
        if let Err(e) = self.limiter.increment(user_id, SOCKET_EVENTS, 1).await {
            warn!(user_id = %user_id, error = %e, "Failed to count inbound event");
        }
        Ok(())
    }

    /// Length of one counting window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Per-user window counters currently held.
    pub fn tracked_windows(&self) -> usize {
        self.windows.len()
    }

    /// Drops counters from every window before the current one.
    pub async fn purge(&self) -> AppResult<u64> {
        self.limiter.purge_expired(0).await
    }
}

#[cfg(test)]
mod tests {
    use greenai_core::error::ErrorKind;

    use super::*;

    fn config(max_events: u64) -> InboundRateLimitConfig {
        InboundRateLimitConfig {
            enabled: true,
            max_events,
            window_seconds: 3_600,
        }
    }

    #[tokio::test]
    async fn test_admits_up_to_max() {
        let limiter = InboundRateLimiter::new(&config(3));
        let user = UserId::new();
        for _ in 0..3 {
            assert!(limiter.admit(user).await.is_ok());
        }
        let err = limiter.admit(user).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::RateLimit);
        assert!(limiter.admit(UserId::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_disabled_admits_everything() {
        let limiter = InboundRateLimiter::new(&InboundRateLimitConfig {
            enabled: false,
            ..config(0)
        });
        assert!(limiter.admit(UserId::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_purge_drops_finished_windows() {
        let limiter = InboundRateLimiter::new(&InboundRateLimitConfig {
            window_seconds: 1,
            ..config(10)
        });
        let user = UserId::new();
        assert!(limiter.admit(user).await.is_ok());
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert!(limiter.admit(user).await.is_ok());
        assert_eq!(limiter.tracked_windows(), 2);

        assert!(limiter.purge().await.unwrap() >= 1);
        assert!(limiter.tracked_windows() <= 1);
    }
}
