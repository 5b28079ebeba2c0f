//! Shared helpers for HTTP tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use greenai_api::{AppState, build_router};
use greenai_auth::jwt::{JwtDecoder, JwtEncoder};
use greenai_core::config::AppConfig;
use greenai_core::types::{UserId, UserRole, VerifiedIdentity};
use greenai_realtime::notification::{LoggingPushDelivery, MemoryNotificationStore};
use greenai_realtime::usage::{ConfigPlanLookup, MemoryUsageStore};
use greenai_realtime::{Collaborators, RealtimeEngine};

/// Router plus a token issuer for the same secret.
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Engine behind the router
    pub engine: RealtimeEngine,
    /// Issues tokens the router accepts
    pub tokens: JwtEncoder,
}

impl TestApp {
    /// Application built from default configuration plus a TOML overlay.
    pub fn new(overlay: &str) -> Self {
        let config = AppConfig::from_toml(overlay).expect("test config");
        let verifier = Arc::new(JwtDecoder::new(&config.auth));
        let collaborators = Collaborators {
            verifier: verifier.clone(),
            notifications: Arc::new(MemoryNotificationStore::new()),
            usage: Arc::new(MemoryUsageStore::new()),
            plans: Arc::new(ConfigPlanLookup::new(config.membership.clone())),
            push: Arc::new(LoggingPushDelivery),
        };
        let engine =
            RealtimeEngine::new(config.realtime.clone(), &config.membership, collaborators);
        let tokens = JwtEncoder::new(&config.auth);
        let state = AppState::new(config, engine.clone(), verifier);

        Self {
            router: build_router(state),
            engine,
            tokens,
        }
    }

    /// Bearer token for a fresh farmer account.
    pub fn token(&self) -> (UserId, String) {
        let identity = VerifiedIdentity {
            user_id: UserId::new(),
            username: "farmer".to_string(),
            role: UserRole::Farmer,
            is_verified: true,
        };
        let token = self.tokens.issue(&identity).expect("token");
        (identity.user_id, token)
    }

    /// Sends a request and returns status plus parsed JSON body.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}
