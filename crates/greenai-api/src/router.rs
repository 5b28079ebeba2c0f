//! Route definitions for the GreenAI HTTP surface.
//!
//! REST routes are mounted under `/api`; the WebSocket upgrade lives at `/ws`.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::cors::build_cors_layer;
use crate::middleware::logging::request_logging;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(health_routes())
        .merge(auth_routes())
        .merge(usage_routes());

    let ws_routes = Router::new().route("/ws", get(handlers::ws::ws_upgrade));

    let cors = build_cors_layer(&state.config.server);

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(request_logging))
        .with_state(state)
}

/// Health check (no auth required)
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}

/// Token revocation
fn auth_routes() -> Router<AppState> {
    Router::new().route("/auth/revoke", post(handlers::auth::revoke))
}

/// Membership usage gating for other platform services
fn usage_routes() -> Router<AppState> {
    Router::new()
        .route("/membership/usage", get(handlers::usage::list_usage))
        .route("/membership/usage/check", post(handlers::usage::check_usage))
        .route("/membership/usage/track", post(handlers::usage::track_usage))
}
