//! Per-user usage counters checked against membership plan limits.

pub mod limiter;
pub mod period;
pub mod plans;
pub mod rate;
pub mod store;

pub use limiter::{LimitCheck, UsageLimiter};
pub use period::PeriodPolicy;
pub use plans::{ConfigPlanLookup, UniformPlanLookup};
pub use rate::InboundRateLimiter;
pub use store::MemoryUsageStore;
