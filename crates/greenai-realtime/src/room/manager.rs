//! Room manager: which connections are in which topic rooms.
//!
//! Membership is per connection: one user with two tabs in a room holds two
//! memberships. Broadcast resolves every member through the registry when it
//! delivers, so a connection deregistered a moment earlier is skipped.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, warn};

use greenai_core::types::{ConnectionId, RoomId, UserId};

use crate::connection::handle::ConnectionHandle;
use crate::connection::registry::ConnectionRegistry;
use crate::message::types::OutboundMessage;

use super::subscription::SubscriptionTracker;

/// Recipients to skip when broadcasting to a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclude {
    /// Deliver to every member.
    Nobody,
    /// Skip one connection.
    Connection(ConnectionId),
    /// Skip every connection of one user.
    User(UserId),
}

impl Exclude {
    fn skips(&self, handle: &ConnectionHandle) -> bool {
        match self {
            Self::Nobody => false,
            Self::Connection(id) => handle.id == *id,
            Self::User(user_id) => handle.user_id == *user_id,
        }
    }
}

/// Registry of topic rooms and their member connections.
#[derive(Debug)]
pub struct RoomManager {
    /// Room ID → member connection IDs. Entries are never empty.
    rooms: DashMap<RoomId, HashSet<ConnectionId>>,
    /// Reverse index.
    subscriptions: SubscriptionTracker,
    /// Connection registry, the source of liveness.
    registry: Arc<ConnectionRegistry>,
}

impl RoomManager {
    /// Creates a new room manager.
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            rooms: DashMap::new(),
            subscriptions: SubscriptionTracker::new(),
            registry,
        }
    }

    /// Adds a connection to a room and tells the other members.
    ///
    /// Returns `true` on a fresh join; re-joining is a silent no-op.
    pub fn join(&self, conn_id: ConnectionId, room_id: &RoomId) -> bool {
        let Some(handle) = self.registry.get(&conn_id) else {
            warn!(conn_id = %conn_id, room_id = %room_id, "Join from unknown connection");
            return false;
        };

        let fresh = self
            .rooms
            .entry(room_id.clone())
            .or_default()
            .insert(conn_id);
        if !fresh {
            return false;
        }
        self.subscriptions.add(conn_id, room_id.clone());

        // A concurrent deregister may have swept rooms before our insert landed.
        if self.registry.get(&conn_id).is_none() {
            self.remove_member(conn_id, room_id);
            debug!(conn_id = %conn_id, room_id = %room_id, "Join raced with disconnect");
            return false;
        }

        let joined = OutboundMessage::UserJoinedRoom {
            user_id: handle.user_id,
            username: handle.username.clone(),
            room_id: room_id.clone(),
        };
        self.broadcast(room_id, &joined, Exclude::Connection(conn_id));

        debug!(conn_id = %conn_id, room_id = %room_id, "Joined room");
        true
    }

    /// Removes a connection from a room and tells the remaining members.
    ///
    /// Returns the leaving handle when a membership was actually removed.
    pub fn leave(&self, conn_id: ConnectionId, room_id: &RoomId) -> Option<Arc<ConnectionHandle>> {
        if !self.rooms.contains_key(room_id) {
            warn!(conn_id = %conn_id, room_id = %room_id, "Leave for unknown room");
            return None;
        }
        if !self.remove_member(conn_id, room_id) {
            return None;
        }

        let Some(handle) = self.registry.get(&conn_id) else {
            warn!(conn_id = %conn_id, room_id = %room_id, "Leave from unknown connection");
            return None;
        };

        let left = OutboundMessage::UserLeftRoom {
            user_id: handle.user_id,
            username: handle.username.clone(),
            room_id: room_id.clone(),
        };
        self.broadcast(room_id, &left, Exclude::Connection(conn_id));

        debug!(conn_id = %conn_id, room_id = %room_id, "Left room");
        Some(handle)
    }

    /// Drops a connection from every room it joined, without notifications.
    ///
    /// Returns the rooms it was removed from.
    pub fn remove_connection(&self, conn_id: ConnectionId) -> Vec<RoomId> {
        let rooms: Vec<RoomId> = self.subscriptions.remove_all(conn_id).into_iter().collect();
        for room_id in &rooms {
            self.remove_from_room(conn_id, room_id);
        }
        if !rooms.is_empty() {
            debug!(conn_id = %conn_id, rooms = rooms.len(), "Removed connection from rooms");
        }
        rooms
    }

    /// Delivers a message to every live member of a room.
    ///
    /// Returns the number of connections the message was enqueued on.
    pub fn broadcast(&self, room_id: &RoomId, message: &OutboundMessage, exclude: Exclude) -> usize {
        let mut sent = 0;
        for handle in self.members_of(room_id) {
            if exclude.skips(&handle) {
                continue;
            }
            if handle.send(message.clone()) {
                sent += 1;
            }
        }
        sent
    }

    /// Broadcasts a named domain event with a payload.
    pub fn broadcast_event(&self, room_id: &RoomId, event: &str, payload: serde_json::Value) -> usize {
        let message = OutboundMessage::RoomEvent {
            room_id: room_id.clone(),
            event: event.to_string(),
            payload,
        };
        self.broadcast(room_id, &message, Exclude::Nobody)
    }

    /// Live member connections, resolved through the registry now.
    pub fn members_of(&self, room_id: &RoomId) -> Vec<Arc<ConnectionHandle>> {
        let ids: Vec<ConnectionId> = self
            .rooms
            .get(room_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default();
        ids.iter().filter_map(|id| self.registry.get(id)).collect()
    }

    /// Rooms a connection has joined.
    pub fn rooms_of(&self, conn_id: ConnectionId) -> HashSet<RoomId> {
        self.subscriptions.rooms_of(conn_id)
    }

    /// Whether a connection is a member of a room.
    pub fn is_member(&self, conn_id: ConnectionId, room_id: &RoomId) -> bool {
        self.rooms
            .get(room_id)
            .map(|members| members.contains(&conn_id))
            .unwrap_or(false)
    }

    /// Whether the room currently has any members.
    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Returns the number of non-empty rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn remove_member(&self, conn_id: ConnectionId, room_id: &RoomId) -> bool {
        let removed = self.remove_from_room(conn_id, room_id);
        self.subscriptions.remove(conn_id, room_id);
        removed
    }

    fn remove_from_room(&self, conn_id: ConnectionId, room_id: &RoomId) -> bool {
        match self.rooms.entry(room_id.clone()) {
            Entry::Occupied(mut entry) => {
                let removed = entry.get_mut().remove(&conn_id);
                if entry.get().is_empty() {
                    entry.remove();
                }
                removed
            }
            Entry::Vacant(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use greenai_core::types::{UserRole, VerifiedIdentity};

    use super::*;
    use crate::connection::handle::ConnectionMeta;

    fn setup() -> (Arc<ConnectionRegistry>, RoomManager) {
        let registry = Arc::new(ConnectionRegistry::new());
        let rooms = RoomManager::new(registry.clone());
        (registry, rooms)
    }

    fn connect(
        registry: &ConnectionRegistry,
        user_id: UserId,
    ) -> (ConnectionId, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(16);
        let identity = VerifiedIdentity {
            user_id,
            username: "kiran".to_string(),
            role: UserRole::Farmer,
            is_verified: false,
        };
        let reg = registry.register(identity, ConnectionMeta::default(), tx);
        (reg.handle.id, rx)
    }

    fn drain(rx: &mut mpsc::Receiver<OutboundMessage>) -> Vec<OutboundMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn test_join_notifies_others_once() {
        let (registry, rooms) = setup();
        let room = RoomId::new("topic-42");
        let (a, mut rx_a) = connect(&registry, UserId::new());
        let (b, mut rx_b) = connect(&registry, UserId::new());

        assert!(rooms.join(a, &room));
        assert!(rooms.join(b, &room));
        assert!(!rooms.join(b, &room));

        let seen_by_a = drain(&mut rx_a);
        assert_eq!(seen_by_a.len(), 1);
        assert!(matches!(seen_by_a[0], OutboundMessage::UserJoinedRoom { .. }));
        assert!(drain(&mut rx_b).is_empty());
        assert_eq!(rooms.members_of(&room).len(), 2);
    }

    #[test]
    fn test_two_tabs_are_two_memberships() {
        let (registry, rooms) = setup();
        let room = RoomId::new("topic-7");
        let user = UserId::new();
        let (tab1, _rx1) = connect(&registry, user);
        let (tab2, _rx2) = connect(&registry, user);

        rooms.join(tab1, &room);
        rooms.join(tab2, &room);
        assert_eq!(rooms.members_of(&room).len(), 2);

        rooms.leave(tab1, &room);
        assert!(rooms.is_member(tab2, &room));
        assert!(!rooms.is_member(tab1, &room));
    }

    #[test]
    fn test_empty_room_is_removed() {
        let (registry, rooms) = setup();
        let room = RoomId::new("topic-1");
        let (a, _rx) = connect(&registry, UserId::new());
        rooms.join(a, &room);
        assert!(rooms.leave(a, &room).is_some());
        assert!(rooms.leave(a, &room).is_none());
        assert!(!rooms.contains(&room));
        assert_eq!(rooms.room_count(), 0);
    }

    #[test]
    fn test_unknown_connection_and_room_are_no_ops() {
        let (_registry, rooms) = setup();
        assert!(!rooms.join(ConnectionId::new(), &RoomId::new("x")));
        assert!(rooms.leave(ConnectionId::new(), &RoomId::new("x")).is_none());
    }

    #[test]
    fn test_broadcast_skips_deregistered_member() {
        let (registry, rooms) = setup();
        let room = RoomId::new("topic-9");
        let (a, mut rx_a) = connect(&registry, UserId::new());
        let (b, mut rx_b) = connect(&registry, UserId::new());
        rooms.join(a, &room);
        rooms.join(b, &room);
        drain(&mut rx_a);

        // Membership not yet cleaned up; registry no longer knows `b`.
        registry.deregister(&b);
        let sent = rooms.broadcast_event(&room, "post_created", serde_json::json!({"id": 1}));
        assert_eq!(sent, 1);
        assert_eq!(drain(&mut rx_a).len(), 1);
        assert!(drain(&mut rx_b).is_empty());

        assert_eq!(rooms.remove_connection(b), vec![room.clone()]);
        assert!(rooms.rooms_of(b).is_empty());
    }

    #[test]
    fn test_exclude_user_skips_all_tabs() {
        let (registry, rooms) = setup();
        let room = RoomId::new("topic-3");
        let user = UserId::new();
        let (tab1, mut rx1) = connect(&registry, user);
        let (tab2, mut rx2) = connect(&registry, user);
        let (other, mut rx_other) = connect(&registry, UserId::new());
        for conn in [tab1, tab2, other] {
            rooms.join(conn, &room);
        }
        drain(&mut rx1);
        drain(&mut rx2);
        drain(&mut rx_other);

        let sent = rooms.broadcast(&room, &OutboundMessage::ping(), Exclude::User(user));
        assert_eq!(sent, 1);
        assert!(drain(&mut rx1).is_empty());
        assert!(drain(&mut rx2).is_empty());
        assert_eq!(drain(&mut rx_other).len(), 1);
    }
}
