//! Notification delivery: persist, fan out live, fall back to push.

pub mod dispatcher;
pub mod push;
pub mod store;

pub use dispatcher::{Delivery, NotificationDispatcher};
pub use push::LoggingPushDelivery;
pub use store::MemoryNotificationStore;
