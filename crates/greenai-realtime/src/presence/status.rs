//! Presence status definitions.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use greenai_core::types::UserId;

use crate::message::types::OutboundMessage;

/// User presence status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    /// User is connected and available.
    Online,
    /// User has marked themselves as away.
    Away,
    /// User is not connected, or appears offline.
    Offline,
}

impl PresenceStatus {
    /// Converts to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Away => "away",
            Self::Offline => "offline",
        }
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored presence for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    /// Last explicit or derived status.
    pub status: PresenceStatus,
    /// Last activity.
    pub last_seen: DateTime<Utc>,
    /// When the record lapses without renewal.
    pub expires_at: DateTime<Utc>,
}

impl PresenceRecord {
    /// Status as observed at `now`; a lapsed record reads as offline.
    pub fn effective_status(&self, now: DateTime<Utc>) -> PresenceStatus {
        if self.expires_at <= now {
            PresenceStatus::Offline
        } else {
            self.status
        }
    }
}

/// A status transition to announce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceChange {
    /// User whose status changed.
    pub user_id: UserId,
    /// New status.
    pub status: PresenceStatus,
    /// Last activity.
    pub last_seen: DateTime<Utc>,
}

impl PresenceChange {
    /// Builds the `user_status_changed` event.
    pub fn to_message(&self) -> OutboundMessage {
        OutboundMessage::UserStatusChanged {
            user_id: self.user_id,
            status: self.status,
            last_seen: self.last_seen,
        }
    }
}
