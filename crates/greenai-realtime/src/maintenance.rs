//! Periodic maintenance for the real-time engine.
//!
//! - presence sweep: lapsed presence records go offline
//! - inactivity reaper: idle connections are closed and deregistered
//! - usage purge: counters past retention are dropped
//! - transient purge: finished rate-limit windows and lapsed revocations are dropped

use std::time::Duration;

use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info};

use greenai_core::error::AppError;

use crate::server::RealtimeEngine;

/// Usage counters are purged once a day at 03:00 UTC.
const USAGE_PURGE_SCHEDULE: &str = "0 0 3 * * *";

/// Cron scheduler running the engine's background passes.
pub struct MaintenanceScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Engine the jobs operate on
    engine: RealtimeEngine,
}

impl std::fmt::Debug for MaintenanceScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaintenanceScheduler").finish()
    }
}

impl MaintenanceScheduler {
    /// Create a new scheduler for the engine
    pub async fn new(engine: RealtimeEngine) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self { scheduler, engine })
    }

    /// Register all maintenance jobs
    pub async fn register_default_tasks(&self) -> Result<(), AppError> {
        let config = self.engine.config().clone();
        self.register_presence_sweep(config.presence_sweep_interval())
            .await?;
        self.register_inactivity_reaper(config.inactivity_check_interval())
            .await?;
        self.register_usage_purge().await?;
        self.register_transient_purge(self.engine.rate_limiter.window())
            .await?;

        info!("All maintenance tasks registered");
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        info!("Maintenance scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&self) -> Result<(), AppError> {
        let mut scheduler = self.scheduler.clone();
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        info!("Maintenance scheduler shut down");
        Ok(())
    }

    /// Presence sweep: every `interval`
    async fn register_presence_sweep(&self, interval: Duration) -> Result<(), AppError> {
        let engine = self.engine.clone();
        let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
            let engine = engine.clone();
            Box::pin(async move {
                let expired = engine.expire_presence();
                if expired > 0 {
                    debug!(expired = expired, "Presence sweep complete");
                }
            })
        })
        .map_err(|e| AppError::internal(format!("Failed to create presence_sweep job: {e}")))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add presence_sweep job: {e}")))?;

        info!(interval_secs = interval.as_secs(), "Registered: presence_sweep");
        Ok(())
    }

    /// Inactivity reaper: every `interval`
    async fn register_inactivity_reaper(&self, interval: Duration) -> Result<(), AppError> {
        let engine = self.engine.clone();
        let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
            let engine = engine.clone();
            Box::pin(async move {
                let reaped = engine.reap_inactive();
                if reaped > 0 {
                    info!(reaped = reaped, "Inactive connections closed");
                }
            })
        })
        .map_err(|e| AppError::internal(format!("Failed to create inactivity_reaper job: {e}")))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add inactivity_reaper job: {e}")))?;

        info!(interval_secs = interval.as_secs(), "Registered: inactivity_reaper");
        Ok(())
    }

    /// Usage purge: daily
    async fn register_usage_purge(&self) -> Result<(), AppError> {
        let engine = self.engine.clone();
        let job = Job::new_async(USAGE_PURGE_SCHEDULE, move |_uuid, _lock| {
            let engine = engine.clone();
            Box::pin(async move {
                if let Err(e) = engine.purge_usage().await {
                    error!(error = %e, "Usage purge failed");
                }
            })
        })
        .map_err(|e| AppError::internal(format!("Failed to create usage_purge job: {e}")))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add usage_purge job: {e}")))?;

        info!("Registered: usage_purge (daily 03:00 UTC)");
        Ok(())
    }

    /// Transient purge: once per rate-limit window
    async fn register_transient_purge(&self, interval: Duration) -> Result<(), AppError> {
        let interval = interval.max(Duration::from_secs(1));
        let engine = self.engine.clone();
        let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
            let engine = engine.clone();
            Box::pin(async move {
                if let Err(e) = engine.purge_transient().await {
                    error!(error = %e, "Transient purge failed");
                }
            })
        })
        .map_err(|e| AppError::internal(format!("Failed to create transient_purge job: {e}")))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add transient_purge job: {e}")))?;

        info!(interval_secs = interval.as_secs(), "Registered: transient_purge");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use greenai_auth::JwtDecoder;
    use greenai_core::config::{AuthConfig, MembershipConfig, RealtimeConfig};

    use super::*;
    use crate::notification::{LoggingPushDelivery, MemoryNotificationStore};
    use crate::server::Collaborators;
    use crate::usage::{ConfigPlanLookup, MemoryUsageStore};

    fn engine() -> RealtimeEngine {
        let membership = MembershipConfig::default();
        RealtimeEngine::new(
            RealtimeConfig::default(),
            &membership,
            Collaborators {
                verifier: Arc::new(JwtDecoder::new(&AuthConfig::default())),
                notifications: Arc::new(MemoryNotificationStore::new()),
                usage: Arc::new(MemoryUsageStore::new()),
                plans: Arc::new(ConfigPlanLookup::new(membership.clone())),
                push: Arc::new(LoggingPushDelivery),
            },
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_default_tasks_register_start_and_stop() {
        let scheduler = MaintenanceScheduler::new(engine()).await.unwrap();

        scheduler.register_default_tasks().await.unwrap();
        scheduler.start().await.unwrap();
        scheduler.shutdown().await.unwrap();
    }
}
