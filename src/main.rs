//! GreenAI realtime server
//!
//! Main entry point that wires the realtime engine, background maintenance,
//! and the HTTP/WebSocket surface together.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use greenai_auth::JwtDecoder;
use greenai_core::config::AppConfig;
use greenai_core::error::AppError;
use greenai_realtime::maintenance::MaintenanceScheduler;
use greenai_realtime::notification::{LoggingPushDelivery, MemoryNotificationStore};
use greenai_realtime::usage::{ConfigPlanLookup, MemoryUsageStore};
use greenai_realtime::{Collaborators, RealtimeEngine};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration from `config/` and `GREENAI__*` environment variables
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("GREENAI_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if config.logging.is_json() {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(config.logging.thread_ids)
            .init();
    } else {
        fmt()
            .pretty()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(config.logging.thread_ids)
            .init();
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting GreenAI realtime v{}", env!("CARGO_PKG_VERSION"));

    if config.auth.jwt_secret == "CHANGE_ME_IN_PRODUCTION" {
        tracing::warn!("Using the default JWT secret; set GREENAI__AUTH__JWT_SECRET");
    }

    // ── Step 1: Collaborators ────────────────────────────────────
    let verifier = Arc::new(JwtDecoder::new(&config.auth));
    let collaborators = Collaborators {
        verifier: verifier.clone(),
        notifications: Arc::new(MemoryNotificationStore::new()),
        usage: Arc::new(MemoryUsageStore::new()),
        plans: Arc::new(ConfigPlanLookup::new(config.membership.clone())),
        push: Arc::new(LoggingPushDelivery),
    };

    // ── Step 2: Realtime engine ──────────────────────────────────
    let engine = RealtimeEngine::new(config.realtime.clone(), &config.membership, collaborators);

    // ── Step 3: Background maintenance ───────────────────────────
    let scheduler = MaintenanceScheduler::new(engine.clone()).await?;
    scheduler.register_default_tasks().await?;
    scheduler.start().await?;
    tracing::info!("Maintenance scheduler started");

    // ── Step 4: HTTP server ──────────────────────────────────────
    let addr = config.server.bind_address();
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let state = greenai_api::AppState::new(config, engine.clone(), verifier);
    let app = greenai_api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("GreenAI realtime listening on {}", addr);

    // ── Step 5: Graceful shutdown ────────────────────────────────
    let shutdown_engine = engine.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                tracing::info!("Shutdown signal received, starting graceful shutdown...");
                // Closing every connection ends the open WebSocket tasks.
                shutdown_engine.shutdown();
            })
            .await
    });

    let stopping = engine.shutdown_token();
    tokio::select! {
        joined = &mut server => {
            joined
                .map_err(|e| AppError::internal(format!("Server task failed: {e}")))?
                .map_err(|e| AppError::internal(format!("Server error: {e}")))?;
        }
        _ = async {
            stopping.cancelled().await;
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!(grace_seconds = grace.as_secs(), "Requests still open after grace period, aborting");
            server.abort();
        }
    }

    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!(error = %e, "Maintenance scheduler shutdown failed");
    }

    tracing::info!("GreenAI realtime shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
