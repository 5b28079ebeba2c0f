//! Notification envelope delivered to users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{NotificationId, UserId};

/// Kind of domain event a notification describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Someone replied to the user's topic or post.
    Reply,
    /// Someone liked the user's post.
    Like,
    /// The user was mentioned.
    Mention,
    /// The user's answer was accepted as the solution.
    Solution,
    /// The user earned a badge.
    Badge,
    /// Platform-level message.
    System,
}

impl NotificationKind {
    /// Converts to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reply => "reply",
            Self::Like => "like",
            Self::Mention => "mention",
            Self::Solution => "solution",
            Self::Badge => "badge",
            Self::System => "system",
        }
    }
}

/// A typed notification targeted at one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEnvelope {
    /// Notification ID.
    pub id: NotificationId,
    /// Event kind.
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Recipient.
    pub target_user_id: UserId,
    /// Short title.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Additional event payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Whether the recipient has read it.
    pub is_read: bool,
}

impl NotificationEnvelope {
    /// Creates a new unread notification.
    pub fn new(
        kind: NotificationKind,
        target_user_id: UserId,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            kind,
            target_user_id,
            title: title.into(),
            message: message.into(),
            data: None,
            created_at: Utc::now(),
            is_read: false,
        }
    }

    /// Attaches an event payload.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Filter for notification lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationQuery {
    /// Recipient.
    pub user_id: UserId,
    /// Only unread notifications.
    pub unread_only: bool,
    /// Page number (1-based).
    pub page: usize,
    /// Page size.
    pub limit: usize,
}

impl NotificationQuery {
    /// First page of a user's unread notifications.
    pub fn unread(user_id: UserId, limit: usize) -> Self {
        Self {
            user_id,
            unread_only: true,
            page: 1,
            limit,
        }
    }

    /// A page of all of a user's notifications.
    pub fn page(user_id: UserId, page: usize, limit: usize) -> Self {
        Self {
            user_id,
            unread_only: false,
            page: page.max(1),
            limit,
        }
    }

    /// Number of entries to skip.
    pub fn offset(&self) -> usize {
        (self.page.max(1) - 1).saturating_mul(self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_by_page() {
        let user = UserId::new();
        assert_eq!(NotificationQuery::page(user, 0, 20).offset(), 0);
        assert_eq!(NotificationQuery::page(user, 1, 20).offset(), 0);
        assert_eq!(NotificationQuery::page(user, 3, 20).offset(), 40);
    }

    #[test]
    fn test_offset_saturates_on_huge_page() {
        let query = NotificationQuery::page(UserId::new(), usize::MAX, 100);
        assert_eq!(query.offset(), usize::MAX);
    }
}
