//! Membership plan and usage limit configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Membership plans and the plan assigned to users without a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipConfig {
    /// Plan used for users with no explicit assignment.
    #[serde(default = "default_plan")]
    pub default_plan: String,
    /// Plan name → plan definition.
    #[serde(default = "default_plans")]
    pub plans: HashMap<String, PlanConfig>,
    /// Number of past monthly periods whose counters are retained.
    #[serde(default = "default_retention")]
    pub usage_retention_months: u32,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            default_plan: default_plan(),
            plans: default_plans(),
            usage_retention_months: default_retention(),
        }
    }
}

/// A single membership plan.
///
/// A resource type absent from `limits` is unlimited on this plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanConfig {
    /// Human-readable plan name.
    #[serde(default)]
    pub display_name: String,
    /// Resource type → maximum uses per period.
    #[serde(default)]
    pub limits: HashMap<String, u64>,
}

fn default_plan() -> String {
    "free".to_string()
}

fn default_retention() -> u32 {
    3
}

fn plan(display_name: &str, limits: &[(&str, u64)]) -> PlanConfig {
    PlanConfig {
        display_name: display_name.to_string(),
        limits: limits
            .iter()
            .map(|(resource, limit)| ((*resource).to_string(), *limit))
            .collect(),
    }
}

fn default_plans() -> HashMap<String, PlanConfig> {
    HashMap::from([
        (
            "free".to_string(),
            plan(
                "Free",
                &[("ai_queries", 10), ("forum_posts", 150), ("products_listed", 3)],
            ),
        ),
        (
            "premium".to_string(),
            plan("Premium", &[("ai_queries", 100), ("products_listed", 25)]),
        ),
        ("pro".to_string(), plan("Pro", &[("ai_queries", 1000)])),
        ("corporate".to_string(), plan("Corporate", &[])),
    ])
}
