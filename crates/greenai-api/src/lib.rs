//! # greenai-api
//!
//! HTTP layer for GreenAI built on Axum.
//!
//! Serves the realtime WebSocket upgrade, a health endpoint, and the
//! membership usage check/track endpoints used by other platform services.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
