//! Connection registry: every live connection indexed by id and by user.
//!
//! The registry is the single source of truth for liveness. Rooms, typing,
//! and notifications resolve recipients through it at delivery time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::mpsc;
use tracing::{debug, info};

use greenai_core::types::{ConnectionId, UserId, VerifiedIdentity};

use crate::message::types::OutboundMessage;

use super::handle::{ConnectionHandle, ConnectionMeta};

/// Result of registering a connection.
#[derive(Debug, Clone)]
pub struct Registered {
    /// The new handle.
    pub handle: Arc<ConnectionHandle>,
    /// Whether this is the user's only live connection.
    pub first_connection: bool,
}

/// Result of deregistering a connection.
#[derive(Debug, Clone)]
pub struct Deregistered {
    /// The removed (now closed) handle.
    pub handle: Arc<ConnectionHandle>,
    /// Whether the user has no live connections left.
    pub last_connection: bool,
}

/// Thread-safe registry of all live connections.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Connection ID → connection handle for direct lookup.
    by_id: DashMap<ConnectionId, Arc<ConnectionHandle>>,
    /// User ID → that user's handles. Entries are never empty.
    by_user: DashMap<UserId, Vec<Arc<ConnectionHandle>>>,
}

impl ConnectionRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates and stores a handle for an authenticated connection.
    ///
    /// Every call creates a new handle; multiple sessions per user are legal.
    pub fn register(
        &self,
        identity: VerifiedIdentity,
        meta: ConnectionMeta,
        sender: mpsc::Sender<OutboundMessage>,
    ) -> Registered {
        let handle = Arc::new(ConnectionHandle::new(identity, meta, sender));
        self.by_id.insert(handle.id, Arc::clone(&handle));

        let first_connection = {
            let mut connections = self.by_user.entry(handle.user_id).or_default();
            connections.push(Arc::clone(&handle));
            connections.len() == 1
        };

        info!(
            conn_id = %handle.id,
            user_id = %handle.user_id,
            first = first_connection,
            "Connection registered"
        );

        Registered {
            handle,
            first_connection,
        }
    }

    /// Removes a connection and closes its handle.
    ///
    /// Idempotent: an unknown or already removed id returns `None`.
    pub fn deregister(&self, conn_id: &ConnectionId) -> Option<Deregistered> {
        let (_, handle) = self.by_id.remove(conn_id)?;
        handle.close();

        let last_connection = match self.by_user.entry(handle.user_id) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().retain(|c| c.id != *conn_id);
                if entry.get().is_empty() {
                    entry.remove();
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(_) => true,
        };

        info!(
            conn_id = %conn_id,
            user_id = %handle.user_id,
            last = last_connection,
            "Connection deregistered"
        );

        Some(Deregistered {
            handle,
            last_connection,
        })
    }

    /// Gets a specific connection by ID.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.get(conn_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Gets all live connections of a user; empty if none.
    pub fn connections_of(&self, user_id: &UserId) -> Vec<Arc<ConnectionHandle>> {
        self.by_user
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Whether the user has at least one live connection.
    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.by_user
            .get(user_id)
            .map(|entry| !entry.value().is_empty())
            .unwrap_or(false)
    }

    /// Returns total number of live connections.
    pub fn count_connections(&self) -> usize {
        self.by_id.len()
    }

    /// Returns number of unique connected users.
    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }

    /// Returns all connected user IDs.
    pub fn online_users(&self) -> Vec<UserId> {
        self.by_user.iter().map(|entry| *entry.key()).collect()
    }

    /// Returns all connection handles.
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_id
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Sends a message to every live connection of a user.
    ///
    /// Returns the number of connections the message was enqueued on.
    pub fn send_to_user(&self, user_id: &UserId, message: &OutboundMessage) -> usize {
        self.connections_of(user_id)
            .iter()
            .filter(|conn| conn.send(message.clone()))
            .count()
    }

    /// Sends a message to every live connection, optionally skipping one user.
    pub fn broadcast_all(&self, message: &OutboundMessage, except_user: Option<UserId>) -> usize {
        let sent = self
            .all_connections()
            .iter()
            .filter(|conn| Some(conn.user_id) != except_user)
            .filter(|conn| conn.send(message.clone()))
            .count();
        debug!(sent = sent, "Broadcast to all connections");
        sent
    }

    /// Connections whose last activity is older than `cutoff`.
    pub fn idle_since(&self, cutoff: DateTime<Utc>) -> Vec<Arc<ConnectionHandle>> {
        self.by_id
            .iter()
            .filter(|entry| entry.value().last_activity() < cutoff)
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}
