//! Usage counter keys and plan limits.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Identity of one usage counter: who, what, and which period.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CounterKey {
    /// User being metered.
    pub user_id: UserId,
    /// Resource type (e.g. `ai_queries`, `forum_posts`).
    pub resource: String,
    /// First instant of the period the counter belongs to.
    pub period_start: DateTime<Utc>,
}

impl CounterKey {
    /// Creates a counter key.
    pub fn new(user_id: UserId, resource: impl Into<String>, period_start: DateTime<Utc>) -> Self {
        Self {
            user_id,
            resource: resource.into(),
            period_start,
        }
    }
}

/// Snapshot of one usage counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Resource type.
    pub resource: String,
    /// Uses recorded in the period.
    pub count: u64,
    /// First instant of the period.
    pub period_start: DateTime<Utc>,
}

/// Per-resource limits of a user's membership plan.
///
/// A resource without an entry is unlimited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    /// Plan name the limits came from.
    pub plan: String,
    /// Resource type → maximum uses per period.
    pub limits: HashMap<String, u64>,
}

impl PlanLimits {
    /// Creates plan limits.
    pub fn new(plan: impl Into<String>, limits: HashMap<String, u64>) -> Self {
        Self {
            plan: plan.into(),
            limits,
        }
    }

    /// Limit for a resource, `None` meaning unlimited.
    pub fn limit_for(&self, resource: &str) -> Option<u64> {
        self.limits.get(resource).copied()
    }
}
