//! Topic rooms: connection-scoped membership and targeted broadcast.

pub mod manager;
pub mod subscription;

pub use manager::{Exclude, RoomManager};
pub use subscription::SubscriptionTracker;
