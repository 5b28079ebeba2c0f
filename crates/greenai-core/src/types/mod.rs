//! Core type definitions used across the GreenAI workspace.

pub mod id;
pub mod identity;
pub mod notification;
pub mod room;
pub mod usage;

pub use id::*;
pub use identity::{UserRole, VerifiedIdentity};
pub use notification::{NotificationEnvelope, NotificationKind, NotificationQuery};
pub use room::RoomId;
pub use usage::{CounterKey, PlanLimits, UsageRecord};
