//! Membership plan lookups.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::info;

use greenai_core::config::MembershipConfig;
use greenai_core::error::AppError;
use greenai_core::result::AppResult;
use greenai_core::traits::PlanLookup;
use greenai_core::types::{PlanLimits, UserId};

/// Resolves plan limits from configuration plus per-user plan assignments.
///
/// Users without an assignment are on the configured default plan.
#[derive(Debug)]
pub struct ConfigPlanLookup {
    config: MembershipConfig,
    assignments: DashMap<UserId, String>,
}

impl ConfigPlanLookup {
    /// Creates a lookup over the configured plans.
    pub fn new(config: MembershipConfig) -> Self {
        Self {
            config,
            assignments: DashMap::new(),
        }
    }

    /// Puts a user on a named plan.
    pub fn assign_plan(&self, user_id: UserId, plan: &str) -> AppResult<()> {
        if !self.config.plans.contains_key(plan) {
            return Err(AppError::validation(format!("Unknown membership plan: {plan}")));
        }
        self.assignments.insert(user_id, plan.to_string());
        info!(user_id = %user_id, plan = %plan, "Membership plan assigned");
        Ok(())
    }

    /// Name of the user's plan.
    pub fn plan_of(&self, user_id: &UserId) -> String {
        self.assignments
            .get(user_id)
            .map(|plan| plan.value().clone())
            .unwrap_or_else(|| self.config.default_plan.clone())
    }
}

#[async_trait]
impl PlanLookup for ConfigPlanLookup {
    async fn plan_limits(&self, user_id: UserId) -> AppResult<PlanLimits> {
        let plan = self.plan_of(&user_id);
        let config = self
            .config
            .plans
            .get(&plan)
            .ok_or_else(|| AppError::not_found(format!("Membership plan not configured: {plan}")))?;
        Ok(PlanLimits::new(plan, config.limits.clone()))
    }
}

/// Same limits for every user. Backs transport-level rate limiting.
#[derive(Debug, Clone)]
pub struct UniformPlanLookup {
    limits: PlanLimits,
}

impl UniformPlanLookup {
    /// Creates a lookup that returns a single limit for one resource.
    pub fn single(name: &str, resource: &str, limit: u64) -> Self {
        Self {
            limits: PlanLimits::new(name, HashMap::from([(resource.to_string(), limit)])),
        }
    }
}

#[async_trait]
impl PlanLookup for UniformPlanLookup {
    async fn plan_limits(&self, _user_id: UserId) -> AppResult<PlanLimits> {
        Ok(self.limits.clone())
    }
}
