//! Usage limiter: per-period counters against membership plan limits.
//!
//! `check_limit` and `increment` are separate calls. Callers check before a
//! gated action and increment after it succeeds, so concurrent requests at
//! the boundary can overshoot a limit slightly. Increments themselves are
//! atomic and never refused.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use greenai_core::error::AppError;
use greenai_core::result::AppResult;
use greenai_core::traits::{PlanLookup, UsageStore};
use greenai_core::types::{CounterKey, UsageRecord, UserId};

use super::period::PeriodPolicy;

/// Outcome of a limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitCheck {
    /// Whether another use is allowed.
    pub allowed: bool,
    /// Uses recorded in the current period.
    pub current: u64,
    /// Plan limit, `None` meaning unlimited.
    pub limit: Option<u64>,
}

impl LimitCheck {
    /// Uses left in the period, `None` meaning unlimited.
    pub fn remaining(&self) -> Option<u64> {
        self.limit.map(|limit| limit.saturating_sub(self.current))
    }

    /// Converts a refusal into a `LimitExceeded` error.
    pub fn into_result(self, resource: &str) -> AppResult<Self> {
        if self.allowed {
            return Ok(self);
        }
        Err(AppError::limit_exceeded(format!(
            "Usage limit reached for {resource}: {} of {}",
            self.current,
            self.limit.unwrap_or(0)
        )))
    }

    fn denied() -> Self {
        Self {
            allowed: false,
            current: 0,
            limit: Some(0),
        }
    }
}

/// Tracks and checks per-user usage counters.
#[derive(Debug, Clone)]
pub struct UsageLimiter {
    store: Arc<dyn UsageStore>,
    plans: Arc<dyn PlanLookup>,
    policy: PeriodPolicy,
}

impl UsageLimiter {
    /// Creates a limiter.
    pub fn new(store: Arc<dyn UsageStore>, plans: Arc<dyn PlanLookup>, policy: PeriodPolicy) -> Self {
        Self {
            store,
            plans,
            policy,
        }
    }

    /// Period bucketing in use.
    pub fn policy(&self) -> PeriodPolicy {
        self.policy
    }

    /// Snapshot of the current-period counter against the user's plan limit.
    ///
    /// Fails closed: if the plan or counter cannot be read the check is denied.
    pub async fn check_limit(&self, user_id: UserId, resource: &str) -> LimitCheck {
        self.check_limit_at(user_id, resource, Utc::now()).await
    }

    /// Limit check as of a given instant.
    pub async fn check_limit_at(
        &self,
        user_id: UserId,
        resource: &str,
        now: DateTime<Utc>,
    ) -> LimitCheck {
        let plan = match self.plans.plan_limits(user_id).await {
            Ok(plan) => plan,
            Err(e) => {
                error!(user_id = %user_id, resource = %resource, error = %e, "Plan lookup failed");
                return LimitCheck::denied();
            }
        };

        let limit = plan.limit_for(resource);
        let key = self.key(user_id, resource, now);
        let current = match self.store.get(&key).await {
            Ok(current) => current,
            Err(e) => {
                error!(user_id = %user_id, resource = %resource, error = %e, "Usage read failed");
                return LimitCheck::denied();
            }
        };

        let check = LimitCheck {
            allowed: limit.is_none_or(|limit| current < limit),
            current,
            limit,
        };
        debug!(
            user_id = %user_id,
            resource = %resource,
            plan = %plan.plan,
            current = check.current,
            allowed = check.allowed,
            "Usage limit checked"
        );
        check
    }

    /// Atomically adds `by` to the current-period counter. Returns the new value.
    pub async fn increment(&self, user_id: UserId, resource: &str, by: u64) -> AppResult<u64> {
        self.increment_at(user_id, resource, by, Utc::now()).await
    }

    /// Increment attributed to the period containing `now`.
    pub async fn increment_at(
        &self,
        user_id: UserId,
        resource: &str,
        by: u64,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let key = self.key(user_id, resource, now);
        let value = self.store.increment(&key, by).await?;
        debug!(user_id = %user_id, resource = %resource, value = value, "Usage incremented");
        Ok(value)
    }

    /// Every counter the user has in the current period.
    pub async fn usage_for(&self, user_id: UserId) -> AppResult<Vec<UsageRecord>> {
        let period_start = self.policy.period_start(Utc::now());
        self.store.list(user_id, period_start).await
    }

    /// Deletes counters older than `keep` periods before the current one.
    pub async fn purge_expired(&self, keep: u32) -> AppResult<u64> {
        let cutoff = self.policy.periods_back(Utc::now(), keep);
        let removed = self.store.purge_before(cutoff).await?;
        if removed > 0 {
            info!(removed = removed, cutoff = %cutoff, "Purged expired usage counters");
        }
        Ok(removed)
    }

    fn key(&self, user_id: UserId, resource: &str, now: DateTime<Utc>) -> CounterKey {
        CounterKey::new(user_id, resource, self.policy.period_start(now))
    }
}
