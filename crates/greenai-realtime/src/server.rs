//! Top-level real-time engine that ties together all subsystems.
//!
//! Transport code talks only to [`RealtimeEngine`]: lifecycle hooks, room
//! commands, notification triggers, usage gating, and maintenance passes.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use greenai_core::config::{MembershipConfig, RealtimeConfig};
use greenai_core::error::AppError;
use greenai_core::result::AppResult;
use greenai_core::traits::{
    IdentityVerifier, NotificationStore, OfflineDelivery, PlanLookup, UsageStore,
};
use greenai_core::types::{
    ConnectionId, NotificationEnvelope, RoomId, UsageRecord, UserId, VerifiedIdentity,
};

use crate::connection::authenticator::ConnectionAuthenticator;
use crate::connection::handle::{ConnectionHandle, ConnectionMeta};
use crate::connection::registry::ConnectionRegistry;
use crate::message::types::OutboundMessage;
use crate::metrics::{MetricsSnapshot, RealtimeMetrics};
use crate::notification::dispatcher::{Delivery, NotificationDispatcher};
use crate::presence::status::{PresenceChange, PresenceStatus};
use crate::presence::tracker::PresenceTracker;
use crate::room::manager::RoomManager;
use crate::typing::coordinator::TypingCoordinator;
use crate::usage::limiter::{LimitCheck, UsageLimiter};
use crate::usage::period::PeriodPolicy;
use crate::usage::rate::InboundRateLimiter;

/// External collaborators the engine is built on.
#[derive(Debug, Clone)]
pub struct Collaborators {
    /// Bearer credential verification.
    pub verifier: Arc<dyn IdentityVerifier>,
    /// Durable notification storage.
    pub notifications: Arc<dyn NotificationStore>,
    /// Usage counter storage.
    pub usage: Arc<dyn UsageStore>,
    /// Membership plan lookup.
    pub plans: Arc<dyn PlanLookup>,
    /// Offline push channel.
    pub push: Arc<dyn OfflineDelivery>,
}

/// Point-in-time view of the engine for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct EngineHealth {
    /// Live connections.
    pub connections: usize,
    /// Users with at least one live connection.
    pub online_users: usize,
    /// Non-empty rooms.
    pub rooms: usize,
    /// Pending typing auto-stop timers.
    pub typing_timers: usize,
    /// Counters.
    pub metrics: MetricsSnapshot,
}

/// Central real-time engine that coordinates all subsystems.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Live connections.
    pub registry: Arc<ConnectionRegistry>,
    /// Presence tracker.
    pub presence: Arc<PresenceTracker>,
    /// Topic rooms.
    pub rooms: Arc<RoomManager>,
    /// Typing indicators.
    pub typing: TypingCoordinator,
    /// Notification dispatcher.
    pub notifications: Arc<NotificationDispatcher>,
    /// Membership usage limiter.
    pub usage: UsageLimiter,
    /// Inbound event rate limiter.
    pub rate_limiter: InboundRateLimiter,
    /// Connect-time credential check.
    pub authenticator: ConnectionAuthenticator,
    /// Metrics collector.
    pub metrics: Arc<RealtimeMetrics>,
    config: Arc<RealtimeConfig>,
    usage_retention_months: u32,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine")
            .field("connections", &self.registry.count_connections())
            .field("rooms", &self.rooms.room_count())
            .finish()
    }
}

impl RealtimeEngine {
    /// Creates a new real-time engine with all subsystems.
    pub fn new(
        config: RealtimeConfig,
        membership: &MembershipConfig,
        collaborators: Collaborators,
    ) -> Self {
        let metrics = Arc::new(RealtimeMetrics::new());
        let registry = Arc::new(ConnectionRegistry::new());
        let presence = Arc::new(PresenceTracker::new(
            registry.clone(),
            config.presence_ttl(),
        ));
        let rooms = Arc::new(RoomManager::new(registry.clone()));
        let typing = TypingCoordinator::new(rooms.clone(), config.typing_timeout());
        let notifications = Arc::new(NotificationDispatcher::new(
            registry.clone(),
            rooms.clone(),
            collaborators.notifications,
            collaborators.push,
            metrics.clone(),
            config.notifications.clone(),
        ));
        let usage = UsageLimiter::new(
            collaborators.usage,
            collaborators.plans,
            PeriodPolicy::CalendarMonth,
        );
        let rate_limiter = InboundRateLimiter::new(&config.rate_limit);
        let authenticator = ConnectionAuthenticator::new(collaborators.verifier);

        info!(
            presence_ttl_seconds = config.presence_ttl_seconds,
            typing_timeout_ms = config.typing_timeout_ms,
            "Real-time engine initialized"
        );

        Self {
            registry,
            presence,
            rooms,
            typing,
            notifications,
            usage,
            rate_limiter,
            authenticator,
            metrics,
            config: Arc::new(config),
            usage_retention_months: membership.usage_retention_months,
            shutdown: CancellationToken::new(),
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// Token cancelled when the engine shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    // -- Connection lifecycle ------------------------------------------------

    /// Verifies a credential and registers the connection.
    ///
    /// An invalid credential is refused before anything is registered.
    pub async fn connect(
        &self,
        credential: Option<&str>,
        meta: ConnectionMeta,
    ) -> AppResult<(Arc<ConnectionHandle>, mpsc::Receiver<OutboundMessage>)> {
        if self.shutdown.is_cancelled() {
            return Err(AppError::service_unavailable("Server is shutting down"));
        }
        let identity = self.authenticator.authenticate(credential).await?;
        Ok(self.on_connect(identity, meta).await)
    }

    /// Revokes a credential so it can no longer open connections.
    ///
    /// Connections it already opened stay up until they close.
    pub async fn revoke_credential(&self, credential: &str) -> AppResult<VerifiedIdentity> {
        let identity = self.authenticator.revoke(credential).await?;
        info!(user_id = %identity.user_id, "Credential revoked");
        Ok(identity)
    }

    /// Registers an authenticated connection and sends the welcome messages.
    ///
    /// Returns the handle and the receiving end of its outbound queue.
    pub async fn on_connect(
        &self,
        identity: VerifiedIdentity,
        meta: ConnectionMeta,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size.max(1));
        let registered = self.registry.register(identity, meta, tx);
        let handle = registered.handle;
        self.metrics.connection_opened();

        if registered.first_connection {
            self.presence.mark_online(handle.user_id);
        } else {
            self.presence.touch(handle.user_id);
        }

        self.send(
            &handle,
            OutboundMessage::Connected {
                connection_id: handle.id,
                user_id: handle.user_id,
                online_users: self.registry.online_users(),
            },
        );

        if self.notifications.sends_unread_on_connect() {
            match self.notifications.unread(handle.user_id).await {
                Ok((0, _)) => {}
                Ok((count, items)) => {
                    self.send(&handle, OutboundMessage::UnreadNotifications { count, items });
                }
                Err(e) => {
                    warn!(conn_id = %handle.id, error = %e, "Failed to load unread notifications");
                }
            }
        }

        (handle, rx)
    }

    /// Deregisters a connection and cleans up presence, rooms, and typing.
    ///
    /// Idempotent. Returns `false` if the connection was already gone.
    pub fn on_disconnect(&self, conn_id: ConnectionId) -> bool {
        let Some(gone) = self.registry.deregister(&conn_id) else {
            debug!(conn_id = %conn_id, "Disconnect for unknown connection");
            return false;
        };
        self.metrics.connection_closed();
        let user_id = gone.handle.user_id;

        if gone.last_connection {
            self.presence.mark_offline(user_id);
            // A reconnect may have registered between the removal and the mark.
            if self.registry.is_online(&user_id) {
                self.presence.mark_online(user_id);
            }
        }

        let rooms = self.rooms.remove_connection(conn_id);

        if gone.last_connection {
            self.typing.clear_user(user_id);
        } else {
            let remaining = self.registry.connections_of(&user_id);
            for room_id in rooms {
                let still_present = remaining
                    .iter()
                    .any(|conn| self.rooms.is_member(conn.id, &room_id));
                if !still_present {
                    self.typing.stop_typing(user_id, &room_id);
                }
            }
        }
        true
    }

    // -- Room commands -------------------------------------------------------

    /// Joins a room. Unknown connections are logged and ignored.
    pub fn on_join_room(&self, conn_id: ConnectionId, room_id: &RoomId) -> bool {
        self.rooms.join(conn_id, room_id)
    }

    /// Leaves a room and clears the user's typing state there.
    pub fn on_leave_room(&self, conn_id: ConnectionId, room_id: &RoomId) -> bool {
        match self.rooms.leave(conn_id, room_id) {
            Some(handle) => {
                self.typing.stop_typing(handle.user_id, room_id);
                true
            }
            None => false,
        }
    }

    /// Marks the connection's user as typing in a room.
    pub fn on_typing_start(&self, conn_id: ConnectionId, room_id: &RoomId) -> bool {
        match self.member_connection(conn_id, room_id) {
            Ok(handle) => self
                .typing
                .start_typing(handle.user_id, &handle.username, room_id),
            Err(e) => {
                warn!(room_id = %room_id, error = %e, "Typing start ignored");
                false
            }
        }
    }

    /// Clears the connection's user typing state in a room.
    pub fn on_typing_stop(&self, conn_id: ConnectionId, room_id: &RoomId) -> bool {
        match self.connection(conn_id) {
            Ok(handle) => self.typing.stop_typing(handle.user_id, room_id),
            Err(e) => {
                warn!(room_id = %room_id, error = %e, "Typing stop ignored");
                false
            }
        }
    }

    /// Explicit presence change from a connection.
    pub fn set_status(&self, conn_id: ConnectionId, status: PresenceStatus) -> Option<PresenceChange> {
        match self.connection(conn_id) {
            Ok(handle) => Some(self.presence.set_status(handle.user_id, status)),
            Err(e) => {
                warn!(status = %status, error = %e, "Status update ignored");
                None
            }
        }
    }

    /// Records inbound activity on a connection.
    pub fn touch(&self, handle: &ConnectionHandle) {
        handle.touch();
        self.presence.touch(handle.user_id);
    }

    // -- Server-initiated events ---------------------------------------------

    /// Persists a notification and delivers it to the target user.
    pub async fn notify(&self, envelope: NotificationEnvelope) -> AppResult<Delivery> {
        self.notifications.send(envelope).await
    }

    /// Broadcasts a domain event to everyone in a room.
    pub fn broadcast_to_room(&self, room_id: &RoomId, event: &str, payload: serde_json::Value) -> usize {
        self.notifications.broadcast_to_room(room_id, event, payload)
    }

    // -- Usage gating --------------------------------------------------------

    /// Current-period usage against the user's plan limit.
    pub async fn check_limit(&self, user_id: UserId, resource: &str) -> LimitCheck {
        self.usage.check_limit(user_id, resource).await
    }

    /// Records `by` uses of a resource.
    pub async fn increment(&self, user_id: UserId, resource: &str, by: u64) -> AppResult<u64> {
        self.usage.increment(user_id, resource, by).await
    }

    /// All of the user's current-period counters.
    pub async fn usage_for(&self, user_id: UserId) -> AppResult<Vec<UsageRecord>> {
        self.usage.usage_for(user_id).await
    }

    // -- Maintenance ---------------------------------------------------------

    /// Transitions lapsed presence records to offline.
    pub fn expire_presence(&self) -> usize {
        self.presence.expire_stale().len()
    }

    /// Force-closes connections idle past the inactivity timeout.
    pub fn reap_inactive(&self) -> usize {
        let timeout = chrono::Duration::from_std(self.config.inactivity_timeout())
            .unwrap_or_else(|_| chrono::Duration::minutes(30));
        let idle = self.registry.idle_since(Utc::now() - timeout);

        let mut reaped = 0;
        for handle in idle {
            handle.send(OutboundMessage::error(
                "INACTIVE",
                "Connection closed after inactivity",
            ));
            if self.on_disconnect(handle.id) {
                self.metrics.connection_reaped();
                reaped += 1;
                info!(conn_id = %handle.id, user_id = %handle.user_id, "Closed inactive connection");
            }
        }
        reaped
    }

    /// Deletes usage counters past retention.
    pub async fn purge_usage(&self) -> AppResult<u64> {
        self.usage.purge_expired(self.usage_retention_months).await
    }

    /// Drops finished rate-limit windows and lapsed credential revocations.
    pub async fn purge_transient(&self) -> AppResult<u64> {
        let windows = self.rate_limiter.purge().await?;
        let revocations = self.authenticator.purge_revoked();
        if windows > 0 || revocations > 0 {
            debug!(windows = windows, revocations = revocations, "Transient state purged");
        }
        Ok(windows + revocations as u64)
    }

    /// Snapshot for health reporting.
    pub fn health(&self) -> EngineHealth {
        EngineHealth {
            connections: self.registry.count_connections(),
            online_users: self.registry.user_count(),
            rooms: self.rooms.room_count(),
            typing_timers: self.typing.pending_timers(),
            metrics: self.metrics.snapshot(),
        }
    }

    /// Closes every connection and stops background work.
    pub fn shutdown(&self) {
        info!("Shutting down real-time engine");
        self.shutdown.cancel();
        self.typing.shutdown();

        let all = self.registry.all_connections();
        for handle in &all {
            if self.registry.deregister(&handle.id).is_some() {
                self.rooms.remove_connection(handle.id);
                self.metrics.connection_closed();
            }
        }
        info!(count = all.len(), "Real-time engine shut down");
    }

    // -- Helpers -------------------------------------------------------------

    pub(crate) fn connection(&self, conn_id: ConnectionId) -> AppResult<Arc<ConnectionHandle>> {
        self.registry
            .get(&conn_id)
            .ok_or_else(|| AppError::unknown_connection(format!("Unknown connection: {conn_id}")))
    }

    /// The connection, provided it has joined the room.
    pub(crate) fn member_connection(
        &self,
        conn_id: ConnectionId,
        room_id: &RoomId,
    ) -> AppResult<Arc<ConnectionHandle>> {
        let handle = self.connection(conn_id)?;
        if !self.rooms.contains(room_id) {
            return Err(AppError::unknown_room(format!("Unknown room: {room_id}")));
        }
        if !self.rooms.is_member(conn_id, room_id) {
            return Err(AppError::authorization(format!("Not a member of room: {room_id}")));
        }
        Ok(handle)
    }

    pub(crate) fn send(&self, handle: &ConnectionHandle, message: OutboundMessage) -> bool {
        let sent = handle.send(message);
        if sent {
            self.metrics.messages_sent(1);
        }
        sent
    }
}
