//! Persistent data store interfaces used by the realtime core.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::result::AppResult;
use crate::types::id::{NotificationId, UserId};
use crate::types::notification::{NotificationEnvelope, NotificationQuery};
use crate::types::usage::{CounterKey, UsageRecord};

/// Durable storage for notification envelopes.
#[async_trait]
pub trait NotificationStore: Send + Sync + std::fmt::Debug + 'static {
    /// Persists a notification. Failure maps to a `Persistence` error.
    async fn save(&self, envelope: &NotificationEnvelope) -> AppResult<()>;

    /// Finds notifications matching the query, newest first.
    async fn find(&self, query: &NotificationQuery) -> AppResult<Vec<NotificationEnvelope>>;

    /// Marks a notification read. Returns `false` if it does not exist or
    /// belongs to another user.
    async fn mark_read(&self, user_id: UserId, id: NotificationId) -> AppResult<bool>;

    /// Counts a user's unread notifications.
    async fn unread_count(&self, user_id: UserId) -> AppResult<u64>;
}

/// Storage for usage counters.
///
/// `increment` must be atomic per key: concurrent increments of the same
/// counter are never lost.
#[async_trait]
pub trait UsageStore: Send + Sync + std::fmt::Debug + 'static {
    /// Adds `by` to the counter, creating it at zero first if needed.
    /// Returns the new value.
    async fn increment(&self, key: &CounterKey, by: u64) -> AppResult<u64>;

    /// Reads the counter, `0` if it does not exist.
    async fn get(&self, key: &CounterKey) -> AppResult<u64>;

    /// Lists a user's counters for one period.
    async fn list(&self, user_id: UserId, period_start: DateTime<Utc>) -> AppResult<Vec<UsageRecord>>;

    /// Deletes counters whose period started before `cutoff`. Returns the
    /// number removed.
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;
}
