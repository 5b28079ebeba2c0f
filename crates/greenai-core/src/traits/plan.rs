//! Membership plan lookup.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::id::UserId;
use crate::types::usage::PlanLimits;

/// Resolves the usage limits of a user's current membership plan.
#[async_trait]
pub trait PlanLookup: Send + Sync + std::fmt::Debug + 'static {
    /// Returns the plan limits for the user.
    async fn plan_limits(&self, user_id: UserId) -> AppResult<PlanLimits>;
}
