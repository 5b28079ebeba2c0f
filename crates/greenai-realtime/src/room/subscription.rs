//! Subscription tracking: which rooms each connection has joined (reverse index).

use std::collections::HashSet;

use dashmap::DashMap;

use greenai_core::types::{ConnectionId, RoomId};

/// Tracks connection-to-room mappings.
#[derive(Debug, Default)]
pub struct SubscriptionTracker {
    /// Connection ID → set of joined rooms.
    conn_to_rooms: DashMap<ConnectionId, HashSet<RoomId>>,
}

impl SubscriptionTracker {
    /// Creates a new subscription tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a membership.
    pub fn add(&self, conn_id: ConnectionId, room_id: RoomId) {
        self.conn_to_rooms.entry(conn_id).or_default().insert(room_id);
    }

    /// Removes a membership, dropping the entry once empty.
    pub fn remove(&self, conn_id: ConnectionId, room_id: &RoomId) {
        if let Some(mut rooms) = self.conn_to_rooms.get_mut(&conn_id) {
            rooms.remove(room_id);
        }
        self.conn_to_rooms
            .remove_if(&conn_id, |_, rooms| rooms.is_empty());
    }

    /// Gets all rooms a connection has joined.
    pub fn rooms_of(&self, conn_id: ConnectionId) -> HashSet<RoomId> {
        self.conn_to_rooms
            .get(&conn_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Removes and returns all memberships of a connection.
    pub fn remove_all(&self, conn_id: ConnectionId) -> HashSet<RoomId> {
        self.conn_to_rooms
            .remove(&conn_id)
            .map(|(_, rooms)| rooms)
            .unwrap_or_default()
    }
}
