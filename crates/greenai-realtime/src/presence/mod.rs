//! User presence tracking with TTL-based expiry.

pub mod status;
pub mod tracker;

pub use status::{PresenceChange, PresenceRecord, PresenceStatus};
pub use tracker::PresenceTracker;
