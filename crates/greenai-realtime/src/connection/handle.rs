//! Individual WebSocket connection handle.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use greenai_core::types::{ConnectionId, UserId, UserRole, VerifiedIdentity};

use crate::message::types::OutboundMessage;

/// Transport metadata captured at connect time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionMeta {
    /// Peer address, if known.
    pub remote_addr: Option<String>,
    /// Client user agent, if sent.
    pub user_agent: Option<String>,
}

/// A handle to a single live connection.
///
/// Holds the sender channel for pushing messages to the client plus the
/// identity of the connected user. Once [`close`](Self::close) returns, no
/// further message is ever enqueued.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// User who owns this connection
    pub user_id: UserId,
    /// Username (cached for display)
    pub username: String,
    /// User's role
    pub role: UserRole,
    /// Whether the account is verified
    pub is_verified: bool,
    /// Transport metadata
    pub meta: ConnectionMeta,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    /// Last inbound activity
    last_activity: RwLock<DateTime<Utc>>,
    /// Sender for outbound messages
    sender: mpsc::Sender<OutboundMessage>,
    /// Set once the connection is deregistered; `send` holds the read side
    closed: RwLock<bool>,
    /// Cancelled when the connection is closed server-side
    cancel: CancellationToken,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(
        identity: VerifiedIdentity,
        meta: ConnectionMeta,
        sender: mpsc::Sender<OutboundMessage>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ConnectionId::new(),
            user_id: identity.user_id,
            username: identity.username,
            role: identity.role,
            is_verified: identity.is_verified,
            meta,
            connected_at: now,
            last_activity: RwLock::new(now),
            sender,
            closed: RwLock::new(false),
            cancel: CancellationToken::new(),
        }
    }

    /// Enqueue an outbound message for this connection.
    ///
    /// Returns `false` if the connection is closed or its buffer is full.
    pub fn send(&self, msg: OutboundMessage) -> bool {
        let closed = self.closed.read().unwrap_or_else(|e| e.into_inner());
        if *closed {
            return false;
        }
        match self.sender.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(conn_id = %self.id, "Connection send buffer full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Marks the connection closed and signals its transport task to stop.
    ///
    /// Waits for any in-flight `send` to finish. Returns `true` on the first call.
    pub fn close(&self) -> bool {
        let first = {
            let mut closed = self.closed.write().unwrap_or_else(|e| e.into_inner());
            let first = !*closed;
            *closed = true;
            first
        };
        self.cancel.cancel();
        first
    }

    /// Whether the connection has been closed
    pub fn is_closed(&self) -> bool {
        *self.closed.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Token cancelled when the server closes this connection.
    pub fn cancelled(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Update last activity timestamp
    pub fn touch(&self) {
        self.touch_at(Utc::now());
    }

    /// Set last activity to a specific instant
    pub fn touch_at(&self, at: DateTime<Utc>) {
        let mut last = self.last_activity.write().unwrap_or_else(|e| e.into_inner());
        if at > *last {
            *last = at;
        }
    }

    /// Last inbound activity
    pub fn last_activity(&self) -> DateTime<Utc> {
        *self.last_activity.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(buffer: usize) -> (ConnectionHandle, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(buffer);
        let identity = VerifiedIdentity {
            user_id: UserId::new(),
            username: "meera".to_string(),
            role: UserRole::Farmer,
            is_verified: false,
        };
        (ConnectionHandle::new(identity, ConnectionMeta::default(), tx), rx)
    }

    #[test]
    fn test_send_after_close_is_refused() {
        let (handle, mut rx) = handle(4);
        assert!(handle.send(OutboundMessage::ping()));
        assert!(handle.close());
        assert!(!handle.close());
        assert!(!handle.send(OutboundMessage::ping()));
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
        assert!(handle.cancelled().is_cancelled());
    }

    #[test]
    fn test_full_buffer_drops() {
        let (handle, _rx) = handle(1);
        assert!(handle.send(OutboundMessage::ping()));
        assert!(!handle.send(OutboundMessage::ping()));
        assert!(!handle.is_closed());
    }

    #[test]
    fn test_touch_is_monotonic() {
        let (handle, _rx) = handle(1);
        let later = Utc::now() + chrono::Duration::minutes(5);
        handle.touch_at(later);
        handle.touch_at(later - chrono::Duration::minutes(10));
        assert_eq!(handle.last_activity(), later);
    }
}
