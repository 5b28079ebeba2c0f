//! Traits for the external collaborators consumed by the realtime core.
//!
//! Each collaborator is reached through one of these traits so the core
//! never assumes a particular storage engine, token format, or push
//! provider.

pub mod delivery;
pub mod identity;
pub mod plan;
pub mod store;

pub use delivery::OfflineDelivery;
pub use identity::IdentityVerifier;
pub use plan::PlanLookup;
pub use store::{NotificationStore, UsageStore};
