//! Shared helpers for engine scenario tests.

#![allow(dead_code)]

use std::sync::Arc;

use tokio::sync::mpsc;

use greenai_auth::jwt::{JwtDecoder, JwtEncoder};
use greenai_core::config::{AuthConfig, MembershipConfig, RealtimeConfig};
use greenai_core::types::{ConnectionId, RoomId, UserId, UserRole, VerifiedIdentity};
use greenai_realtime::connection::{ConnectionHandle, ConnectionMeta};
use greenai_realtime::message::OutboundMessage;
use greenai_realtime::notification::{LoggingPushDelivery, MemoryNotificationStore};
use greenai_realtime::usage::{ConfigPlanLookup, MemoryUsageStore};
use greenai_realtime::{Collaborators, RealtimeEngine};

/// Engine wired to in-memory collaborators.
pub struct TestEngine {
    /// The engine under test
    pub engine: RealtimeEngine,
    /// Notification store behind the engine
    pub store: Arc<MemoryNotificationStore>,
    /// Plan lookup behind the engine
    pub plans: Arc<ConfigPlanLookup>,
    /// Issues tokens the engine accepts
    pub tokens: JwtEncoder,
}

impl TestEngine {
    /// Engine with default settings.
    pub fn new() -> Self {
        Self::with_config(RealtimeConfig::default(), MembershipConfig::default())
    }

    /// Engine with explicit settings.
    pub fn with_config(realtime: RealtimeConfig, membership: MembershipConfig) -> Self {
        let auth = AuthConfig {
            jwt_secret: "scenario-secret".to_string(),
            ..AuthConfig::default()
        };
        let store = Arc::new(MemoryNotificationStore::new());
        let plans = Arc::new(ConfigPlanLookup::new(membership.clone()));
        let collaborators = Collaborators {
            verifier: Arc::new(JwtDecoder::new(&auth)),
            notifications: store.clone(),
            usage: Arc::new(MemoryUsageStore::new()),
            plans: plans.clone(),
            push: Arc::new(LoggingPushDelivery),
        };
        Self {
            engine: RealtimeEngine::new(realtime, &membership, collaborators),
            store,
            plans,
            tokens: JwtEncoder::new(&auth),
        }
    }

    /// Connects a new session for `user`.
    pub async fn connect(&self, user: &VerifiedIdentity) -> Client {
        let (handle, rx) = self
            .engine
            .on_connect(user.clone(), ConnectionMeta::default())
            .await;
        Client { handle, rx }
    }

    /// Connects through the credential check with a freshly issued token.
    pub async fn connect_with_token(&self, user: &VerifiedIdentity) -> Client {
        let token = self.tokens.issue(user).expect("token");
        let (handle, rx) = self
            .engine
            .connect(Some(&token), ConnectionMeta::default())
            .await
            .expect("connect");
        Client { handle, rx }
    }

    /// Sends a raw JSON frame as if it came from `client`.
    pub async fn send_raw(&self, client: &Client, raw: &str) {
        self.engine.handle_inbound(client.id(), raw).await;
    }
}

/// One connected session.
pub struct Client {
    /// Connection handle
    pub handle: Arc<ConnectionHandle>,
    /// Outbound queue
    pub rx: mpsc::Receiver<OutboundMessage>,
}

impl Client {
    /// Connection ID.
    pub fn id(&self) -> ConnectionId {
        self.handle.id
    }

    /// Everything queued so far.
    pub fn drain(&mut self) -> Vec<OutboundMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            out.push(msg);
        }
        out
    }

    /// Typing flags received about `user`, in order.
    pub fn typing_about(&mut self, user: UserId) -> Vec<bool> {
        self.drain()
            .into_iter()
            .filter_map(|msg| match msg {
                OutboundMessage::UserTyping {
                    user_id, is_typing, ..
                } if user_id == user => Some(is_typing),
                _ => None,
            })
            .collect()
    }
}

/// A verified identity with a fresh user ID.
pub fn user(name: &str) -> VerifiedIdentity {
    VerifiedIdentity {
        user_id: UserId::new(),
        username: name.to_string(),
        role: UserRole::Farmer,
        is_verified: true,
    }
}

/// The room most scenarios use.
pub fn topic_42() -> RoomId {
    RoomId::new("topic-42")
}
