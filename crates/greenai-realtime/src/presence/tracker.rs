//! Presence tracker: online/away/offline per user with a renewable TTL.
//!
//! Expiry is a periodic sweep rather than a timer per record. A lapsed
//! record reads as offline even before the sweep removes it.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info};

use greenai_core::types::UserId;

use crate::connection::registry::ConnectionRegistry;

use super::status::{PresenceChange, PresenceRecord, PresenceStatus};

/// Tracks presence state for all users and announces changes.
#[derive(Debug)]
pub struct PresenceTracker {
    /// User ID → presence record
    records: DashMap<UserId, PresenceRecord>,
    /// Connection registry, used for liveness and broadcast
    registry: Arc<ConnectionRegistry>,
    /// Record lifetime without renewal
    ttl: Duration,
}

impl PresenceTracker {
    /// Create a new presence tracker
    pub fn new(registry: Arc<ConnectionRegistry>, ttl: std::time::Duration) -> Self {
        Self {
            records: DashMap::new(),
            registry,
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::minutes(5)),
        }
    }

    /// Marks a user online after their first connection.
    ///
    /// Announces the change to everyone else if the user was not already online.
    pub fn mark_online(&self, user_id: UserId) -> Option<PresenceChange> {
        let now = Utc::now();
        let previous = self.write(user_id, PresenceStatus::Online, now);
        if previous == PresenceStatus::Online {
            return None;
        }
        let change = self.change(user_id, PresenceStatus::Online, now);
        self.announce(&change, Some(user_id));
        Some(change)
    }

    /// Marks a user offline after their last connection closed.
    pub fn mark_offline(&self, user_id: UserId) -> Option<PresenceChange> {
        let now = Utc::now();
        let previous = self
            .records
            .remove(&user_id)
            .map(|(_, record)| record.effective_status(now))
            .unwrap_or(PresenceStatus::Offline);
        if previous == PresenceStatus::Offline {
            return None;
        }
        let change = self.change(user_id, PresenceStatus::Offline, now);
        self.announce(&change, Some(user_id));
        Some(change)
    }

    /// Explicit status change requested by the user. Always announced.
    pub fn set_status(&self, user_id: UserId, status: PresenceStatus) -> PresenceChange {
        let now = Utc::now();
        self.write(user_id, status, now);
        let change = self.change(user_id, status, now);
        self.announce(&change, None);
        info!(user_id = %user_id, status = %status, "Presence status set");
        change
    }

    /// Refreshes the TTL on activity without overriding a manual status.
    ///
    /// Recreates an online record for a connected user whose record lapsed.
    pub fn touch(&self, user_id: UserId) -> Option<PresenceChange> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let revived = match self.records.entry(user_id) {
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                let was = record.effective_status(now);
                record.last_seen = now;
                record.expires_at = expires_at;
                (was == PresenceStatus::Offline && record.status != PresenceStatus::Offline)
                    .then_some(record.status)
            }
            Entry::Vacant(entry) => {
                if !self.registry.is_online(&user_id) {
                    return None;
                }
                entry.insert(PresenceRecord {
                    status: PresenceStatus::Online,
                    last_seen: now,
                    expires_at,
                });
                Some(PresenceStatus::Online)
            }
        };

        let status = revived?;
        let change = self.change(user_id, status, now);
        self.announce(&change, Some(user_id));
        Some(change)
    }

    /// Transitions every lapsed record to offline and announces it.
    pub fn expire_stale(&self) -> Vec<PresenceChange> {
        self.expire_stale_at(Utc::now())
    }

    /// Sweep as of a given instant.
    pub fn expire_stale_at(&self, now: DateTime<Utc>) -> Vec<PresenceChange> {
        let stale: Vec<UserId> = self
            .records
            .iter()
            .filter(|entry| entry.value().expires_at <= now)
            .map(|entry| *entry.key())
            .collect();

        let mut changes = Vec::new();
        for user_id in stale {
            // Re-checked under the shard lock: a touch may have renewed it.
            let removed = self
                .records
                .remove_if(&user_id, |_, record| record.expires_at <= now);
            if let Some((_, record)) = removed {
                if record.status != PresenceStatus::Offline {
                    let change = PresenceChange {
                        user_id,
                        status: PresenceStatus::Offline,
                        last_seen: record.last_seen,
                    };
                    self.announce(&change, Some(user_id));
                    changes.push(change);
                }
            }
        }

        if !changes.is_empty() {
            debug!(count = changes.len(), "Expired stale presence records");
        }
        changes
    }

    /// Current effective status of a user.
    pub fn status_of(&self, user_id: &UserId) -> PresenceStatus {
        self.records
            .get(user_id)
            .map(|record| record.effective_status(Utc::now()))
            .unwrap_or(PresenceStatus::Offline)
    }

    /// Stored record of a user, if any.
    pub fn record(&self, user_id: &UserId) -> Option<PresenceRecord> {
        self.records.get(user_id).map(|record| *record.value())
    }

    /// Number of users whose effective status is not offline.
    pub fn visible_count(&self) -> usize {
        let now = Utc::now();
        self.records
            .iter()
            .filter(|entry| entry.value().effective_status(now) != PresenceStatus::Offline)
            .count()
    }

    /// Writes a status with a fresh TTL. Returns the previous effective status.
    fn write(&self, user_id: UserId, status: PresenceStatus, now: DateTime<Utc>) -> PresenceStatus {
        let record = PresenceRecord {
            status,
            last_seen: now,
            expires_at: now + self.ttl,
        };
        self.records
            .insert(user_id, record)
            .map(|previous| previous.effective_status(now))
            .unwrap_or(PresenceStatus::Offline)
    }

    fn change(&self, user_id: UserId, status: PresenceStatus, now: DateTime<Utc>) -> PresenceChange {
        PresenceChange {
            user_id,
            status,
            last_seen: now,
        }
    }

    fn announce(&self, change: &PresenceChange, except_user: Option<UserId>) {
        self.registry.broadcast_all(&change.to_message(), except_user);
    }
}
