//! Inbound and outbound WebSocket message type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use greenai_core::types::{ConnectionId, NotificationEnvelope, NotificationId, RoomId, UserId};

use crate::presence::status::PresenceStatus;

/// Default notification page size requested by clients.
const DEFAULT_PAGE_LIMIT: usize = 20;

fn default_page() -> usize {
    1
}

fn default_page_limit() -> usize {
    DEFAULT_PAGE_LIMIT
}

/// Messages sent by the client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Join a topic room.
    JoinRoom {
        /// Room to join.
        room_id: RoomId,
    },
    /// Leave a topic room.
    LeaveRoom {
        /// Room to leave.
        room_id: RoomId,
    },
    /// The user started typing in a room.
    TypingStart {
        /// Room being typed in.
        room_id: RoomId,
    },
    /// The user stopped typing in a room.
    TypingStop {
        /// Room being typed in.
        room_id: RoomId,
    },
    /// Explicit presence status change.
    UpdateStatus {
        /// New status.
        status: PresenceStatus,
    },
    /// Mark one of the user's notifications as read.
    MarkNotificationRead {
        /// Notification ID.
        notification_id: NotificationId,
    },
    /// Fetch a page of the user's notifications.
    GetNotifications {
        /// Page number (1-based).
        #[serde(default = "default_page")]
        page: usize,
        /// Page size.
        #[serde(default = "default_page_limit")]
        limit: usize,
    },
    /// Pong response to server ping.
    Pong {
        /// Echoed timestamp.
        #[serde(default)]
        timestamp: i64,
    },
}

impl InboundMessage {
    /// Short event name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "join_room",
            Self::LeaveRoom { .. } => "leave_room",
            Self::TypingStart { .. } => "typing_start",
            Self::TypingStop { .. } => "typing_stop",
            Self::UpdateStatus { .. } => "update_status",
            Self::MarkNotificationRead { .. } => "mark_notification_read",
            Self::GetNotifications { .. } => "get_notifications",
            Self::Pong { .. } => "pong",
        }
    }
}

/// Messages sent by the server to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Sent once after a connection is registered.
    Connected {
        /// The new connection's ID.
        connection_id: ConnectionId,
        /// The authenticated user.
        user_id: UserId,
        /// Users online at connect time.
        online_users: Vec<UserId>,
    },
    /// Unread notifications delivered right after connecting.
    UnreadNotifications {
        /// Total unread count.
        count: u64,
        /// Most recent unread notifications.
        items: Vec<NotificationEnvelope>,
    },
    /// Live notification delivery.
    Notification {
        /// The notification.
        notification: NotificationEnvelope,
    },
    /// Reply to a `get_notifications` request.
    Notifications {
        /// Page number.
        page: usize,
        /// Notifications on the page.
        items: Vec<NotificationEnvelope>,
    },
    /// Acknowledges a `mark_notification_read` request.
    NotificationRead {
        /// Notification ID.
        notification_id: NotificationId,
        /// Whether a notification was updated.
        updated: bool,
    },
    /// Another connection joined a room this connection is in.
    UserJoinedRoom {
        /// User who joined.
        user_id: UserId,
        /// Username.
        username: String,
        /// Room.
        room_id: RoomId,
    },
    /// Another connection left a room this connection is in.
    UserLeftRoom {
        /// User who left.
        user_id: UserId,
        /// Username.
        username: String,
        /// Room.
        room_id: RoomId,
    },
    /// Typing indicator change.
    UserTyping {
        /// User typing.
        user_id: UserId,
        /// Username.
        username: String,
        /// Room.
        room_id: RoomId,
        /// Whether the user is now typing.
        is_typing: bool,
    },
    /// Presence change for a user.
    UserStatusChanged {
        /// User ID.
        user_id: UserId,
        /// New status.
        status: PresenceStatus,
        /// Last activity time.
        last_seen: DateTime<Utc>,
    },
    /// Arbitrary room-scoped event raised by domain logic.
    RoomEvent {
        /// Room.
        room_id: RoomId,
        /// Event name.
        event: String,
        /// Event payload.
        payload: serde_json::Value,
    },
    /// Ping (server keepalive).
    Ping {
        /// Server timestamp.
        timestamp: i64,
    },
    /// Error message.
    Error {
        /// Error code.
        code: String,
        /// Error description.
        message: String,
    },
}

impl OutboundMessage {
    /// Creates an error message.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a ping stamped with the current time.
    pub fn ping() -> Self {
        Self::Ping {
            timestamp: Utc::now().timestamp(),
        }
    }

    /// The user this event is about, if any.
    pub fn subject_user(&self) -> Option<UserId> {
        match self {
            Self::UserJoinedRoom { user_id, .. }
            | Self::UserLeftRoom { user_id, .. }
            | Self::UserTyping { user_id, .. }
            | Self::UserStatusChanged { user_id, .. } => Some(*user_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_tags_are_snake_case() {
        let msg: InboundMessage =
            serde_json::from_str(r#"{"type":"join_room","room_id":"topic-42"}"#).unwrap();
        assert_eq!(
            msg,
            InboundMessage::JoinRoom {
                room_id: RoomId::new("topic-42")
            }
        );
    }

    #[test]
    fn test_get_notifications_defaults() {
        let msg: InboundMessage = serde_json::from_str(r#"{"type":"get_notifications"}"#).unwrap();
        assert_eq!(msg, InboundMessage::GetNotifications { page: 1, limit: 20 });
    }

    #[test]
    fn test_unknown_inbound_type_is_rejected() {
        assert!(serde_json::from_str::<InboundMessage>(r#"{"type":"subscribe"}"#).is_err());
    }

    #[test]
    fn test_typing_event_shape() {
        let user_id = UserId::new();
        let msg = OutboundMessage::UserTyping {
            user_id,
            username: "asha".to_string(),
            room_id: RoomId::new("topic-1"),
            is_typing: true,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "user_typing");
        assert_eq!(value["is_typing"], true);
        assert_eq!(value["user_id"], user_id.to_string());
        assert_eq!(msg.subject_user(), Some(user_id));
    }
}
