//! Shared application state passed to every handler.

use std::sync::Arc;
use std::time::Instant;

use greenai_core::config::AppConfig;
use greenai_core::traits::IdentityVerifier;
use greenai_realtime::RealtimeEngine;

/// State cloned into each request.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<AppConfig>,
    /// Real-time coordination engine.
    pub engine: RealtimeEngine,
    /// Bearer credential check for HTTP routes.
    pub verifier: Arc<dyn IdentityVerifier>,
    /// Process start, for uptime reporting.
    pub started_at: Instant,
}

impl AppState {
    /// Creates the state.
    pub fn new(
        config: AppConfig,
        engine: RealtimeEngine,
        verifier: Arc<dyn IdentityVerifier>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            engine,
            verifier,
            started_at: Instant::now(),
        }
    }
}
