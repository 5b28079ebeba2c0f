//! Notification dispatcher: durable first, then live fan-out or push.

use std::sync::Arc;

use tracing::{debug, error, warn};

use greenai_core::config::NotificationRealtimeConfig;
use greenai_core::error::{AppError, ErrorKind};
use greenai_core::result::AppResult;
use greenai_core::traits::{NotificationStore, OfflineDelivery};
use greenai_core::types::{NotificationEnvelope, NotificationId, NotificationQuery, RoomId, UserId};

use crate::connection::registry::ConnectionRegistry;
use crate::message::types::OutboundMessage;
use crate::metrics::RealtimeMetrics;
use crate::room::manager::RoomManager;

/// How a notification reached its recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Enqueued on this many live connections.
    Live {
        /// Connections reached.
        connections: usize,
    },
    /// No live connection; handed to the push path.
    Offline {
        /// Whether the push collaborator accepted it.
        pushed: bool,
    },
}

/// Routes notifications to live connections, falling back to push.
///
/// Delivery is at most once per connection per call; nothing is replayed.
#[derive(Debug)]
pub struct NotificationDispatcher {
    registry: Arc<ConnectionRegistry>,
    rooms: Arc<RoomManager>,
    store: Arc<dyn NotificationStore>,
    push: Arc<dyn OfflineDelivery>,
    metrics: Arc<RealtimeMetrics>,
    config: NotificationRealtimeConfig,
}

impl NotificationDispatcher {
    /// Create a new dispatcher
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        rooms: Arc<RoomManager>,
        store: Arc<dyn NotificationStore>,
        push: Arc<dyn OfflineDelivery>,
        metrics: Arc<RealtimeMetrics>,
        config: NotificationRealtimeConfig,
    ) -> Self {
        Self {
            registry,
            rooms,
            store,
            push,
            metrics,
            config,
        }
    }

    /// Persists the envelope, then delivers it.
    ///
    /// Fails with a `Persistence` error, and delivers nothing, if the store
    /// rejects the envelope. Push failures are logged only.
    pub async fn send(&self, envelope: NotificationEnvelope) -> AppResult<Delivery> {
        self.store.save(&envelope).await.map_err(|e| {
            error!(
                notification_id = %envelope.id,
                user_id = %envelope.target_user_id,
                error = %e,
                "Failed to persist notification"
            );
            AppError::with_source(ErrorKind::Persistence, "Failed to persist notification", e)
        })?;

        let user_id = envelope.target_user_id;
        let connections = self.registry.connections_of(&user_id);
        if !connections.is_empty() {
            let message = OutboundMessage::Notification {
                notification: envelope.clone(),
            };
            let delivered = connections
                .iter()
                .filter(|conn| conn.send(message.clone()))
                .count();
            if delivered > 0 {
                self.metrics.messages_sent(delivered as u64);
                self.metrics.notification_live();
                debug!(user_id = %user_id, connections = delivered, "Notification delivered live");
                return Ok(Delivery::Live {
                    connections: delivered,
                });
            }
            // Every connection closed after the snapshot.
            debug!(user_id = %user_id, "No connection accepted the notification");
        }

        if !self.config.push_enabled {
            return Ok(Delivery::Offline { pushed: false });
        }

        self.metrics.notification_pushed();
        let pushed = match self.push.push_notify(user_id, &envelope).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    user_id = %user_id,
                    notification_id = %envelope.id,
                    error = %e,
                    "Offline push failed"
                );
                false
            }
        };
        Ok(Delivery::Offline { pushed })
    }

    /// Broadcasts a domain event to a room.
    pub fn broadcast_to_room(&self, room_id: &RoomId, event: &str, payload: serde_json::Value) -> usize {
        let sent = self.rooms.broadcast_event(room_id, event, payload);
        self.metrics.messages_sent(sent as u64);
        sent
    }

    /// Unread count and most recent unread items for a user.
    pub async fn unread(&self, user_id: UserId) -> AppResult<(u64, Vec<NotificationEnvelope>)> {
        let count = self.store.unread_count(user_id).await?;
        if count == 0 {
            return Ok((0, Vec::new()));
        }
        let query = NotificationQuery::unread(user_id, self.config.unread_on_connect_limit);
        let items = self.store.find(&query).await?;
        Ok((count, items))
    }

    /// A page of the user's notifications.
    pub async fn page(
        &self,
        user_id: UserId,
        page: usize,
        limit: usize,
    ) -> AppResult<Vec<NotificationEnvelope>> {
        self.store
            .find(&NotificationQuery::page(user_id, page, limit))
            .await
    }

    /// Marks one of the user's notifications read.
    pub async fn mark_read(&self, user_id: UserId, id: NotificationId) -> AppResult<bool> {
        self.store.mark_read(user_id, id).await
    }

    /// Whether unread items are sent right after connecting.
    pub fn sends_unread_on_connect(&self) -> bool {
        self.config.send_unread_on_connect
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use greenai_core::types::{NotificationKind, UserRole, VerifiedIdentity};

    use super::*;
    use crate::connection::handle::ConnectionMeta;
    use crate::notification::store::MemoryNotificationStore;

    #[derive(Debug, Default)]
    struct RecordingPush {
        pushed: Mutex<Vec<UserId>>,
        fail: bool,
    }

    #[async_trait]
    impl OfflineDelivery for RecordingPush {
        async fn push_notify(&self, user_id: UserId, _envelope: &NotificationEnvelope) -> AppResult<()> {
            self.pushed.lock().unwrap().push(user_id);
            if self.fail {
                return Err(AppError::external_service("push provider down"));
            }
            Ok(())
        }
    }

    #[derive(Debug)]
    struct BrokenStore;

    #[async_trait]
    impl NotificationStore for BrokenStore {
        async fn save(&self, _envelope: &NotificationEnvelope) -> AppResult<()> {
            Err(AppError::internal("disk full"))
        }
        async fn find(&self, _query: &NotificationQuery) -> AppResult<Vec<NotificationEnvelope>> {
            Ok(Vec::new())
        }
        async fn mark_read(&self, _user_id: UserId, _id: NotificationId) -> AppResult<bool> {
            Ok(false)
        }
        async fn unread_count(&self, _user_id: UserId) -> AppResult<u64> {
            Ok(0)
        }
    }

    fn dispatcher(
        store: Arc<dyn NotificationStore>,
        push: Arc<RecordingPush>,
    ) -> (Arc<ConnectionRegistry>, NotificationDispatcher) {
        let registry = Arc::new(ConnectionRegistry::new());
        let rooms = Arc::new(RoomManager::new(registry.clone()));
        let dispatcher = NotificationDispatcher::new(
            registry.clone(),
            rooms,
            store,
            push,
            Arc::new(RealtimeMetrics::new()),
            NotificationRealtimeConfig::default(),
        );
        (registry, dispatcher)
    }

    fn connect(registry: &ConnectionRegistry, user_id: UserId) -> mpsc::Receiver<OutboundMessage> {
        let (tx, rx) = mpsc::channel(8);
        let identity = VerifiedIdentity {
            user_id,
            username: "chen".to_string(),
            role: UserRole::Farmer,
            is_verified: true,
        };
        registry.register(identity, ConnectionMeta::default(), tx);
        rx
    }

    #[tokio::test]
    async fn test_persistence_failure_blocks_delivery() {
        let push = Arc::new(RecordingPush::default());
        let (registry, dispatcher) = dispatcher(Arc::new(BrokenStore), push.clone());
        let user = UserId::new();
        let mut rx = connect(&registry, user);

        let envelope = NotificationEnvelope::new(NotificationKind::Reply, user, "Reply", "hi");
        let err = dispatcher.send(envelope).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Persistence);
        assert!(rx.try_recv().is_err());
        assert!(push.pushed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_offline_user_gets_push() {
        let push = Arc::new(RecordingPush::default());
        let store = Arc::new(MemoryNotificationStore::new());
        let (_registry, dispatcher) = dispatcher(store.clone(), push.clone());
        let user = UserId::new();

        let envelope = NotificationEnvelope::new(NotificationKind::Badge, user, "Badge", "First post");
        let delivery = dispatcher.send(envelope).await.unwrap();
        assert_eq!(delivery, Delivery::Offline { pushed: true });
        assert_eq!(*push.pushed.lock().unwrap(), vec![user]);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_push_failure_is_not_a_dispatch_failure() {
        let push = Arc::new(RecordingPush {
            fail: true,
            ..Default::default()
        });
        let (_registry, dispatcher) =
            dispatcher(Arc::new(MemoryNotificationStore::new()), push);
        let envelope =
            NotificationEnvelope::new(NotificationKind::Mention, UserId::new(), "Mention", "@you");
        let delivery = dispatcher.send(envelope).await.unwrap();
        assert_eq!(delivery, Delivery::Offline { pushed: false });
    }

    #[tokio::test]
    async fn test_online_user_is_not_pushed() {
        let push = Arc::new(RecordingPush::default());
        let (registry, dispatcher) =
            dispatcher(Arc::new(MemoryNotificationStore::new()), push.clone());
        let user = UserId::new();
        let mut rx = connect(&registry, user);

        let envelope = NotificationEnvelope::new(NotificationKind::Like, user, "Like", "+1");
        let delivery = dispatcher.send(envelope.clone()).await.unwrap();
        assert_eq!(delivery, Delivery::Live { connections: 1 });
        assert_eq!(
            rx.try_recv().unwrap(),
            OutboundMessage::Notification {
                notification: envelope
            }
        );
        assert!(push.pushed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_connections_closed_after_snapshot_fall_back_to_push() {
        let push = Arc::new(RecordingPush::default());
        let (registry, dispatcher) =
            dispatcher(Arc::new(MemoryNotificationStore::new()), push.clone());
        let user = UserId::new();
        let _rx = connect(&registry, user);
        for handle in registry.connections_of(&user) {
            handle.close();
        }

        let envelope = NotificationEnvelope::new(NotificationKind::Reply, user, "Reply", "late");
        let delivery = dispatcher.send(envelope).await.unwrap();
        assert_eq!(delivery, Delivery::Offline { pushed: true });
        assert_eq!(*push.pushed.lock().unwrap(), vec![user]);
    }
}
