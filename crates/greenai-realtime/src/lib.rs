//! # greenai-realtime
//!
//! Real-time coordination core for the GreenAI community platform.
//!
//! - **Connection registry**: live connections indexed by id and by user
//! - **Presence**: online/away/offline with TTL expiry
//! - **Rooms**: connection-scoped topic rooms with targeted broadcast
//! - **Typing**: per-room typing sets with keyed auto-stop timers
//! - **Notifications**: persist-then-fan-out with offline push fallback
//! - **Usage**: per-period counters checked against membership plan limits
//! - **Maintenance**: presence sweep, inactivity reaper, counter purge

pub mod connection;
pub mod inbound;
pub mod maintenance;
pub mod message;
pub mod metrics;
pub mod notification;
pub mod presence;
pub mod room;
pub mod server;
pub mod typing;
pub mod usage;

pub use server::{Collaborators, RealtimeEngine};
