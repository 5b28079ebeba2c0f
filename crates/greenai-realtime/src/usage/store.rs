//! In-memory usage counter store.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use greenai_core::result::AppResult;
use greenai_core::traits::UsageStore;
use greenai_core::types::{CounterKey, UsageRecord, UserId};

/// Counters held in memory, one atomic per key.
#[derive(Debug, Default)]
pub struct MemoryUsageStore {
    counters: DashMap<CounterKey, AtomicU64>,
}

impl MemoryUsageStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live counters.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Whether no counters exist.
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn increment(&self, key: &CounterKey, by: u64) -> AppResult<u64> {
        if let Some(counter) = self.counters.get(key) {
            return Ok(counter.fetch_add(by, Ordering::AcqRel) + by);
        }
        let counter = self.counters.entry(key.clone()).or_default();
        Ok(counter.fetch_add(by, Ordering::AcqRel) + by)
    }

    async fn get(&self, key: &CounterKey) -> AppResult<u64> {
        Ok(self
            .counters
            .get(key)
            .map(|counter| counter.load(Ordering::Acquire))
            .unwrap_or(0))
    }

    async fn list(&self, user_id: UserId, period_start: DateTime<Utc>) -> AppResult<Vec<UsageRecord>> {
        let mut records: Vec<UsageRecord> = self
            .counters
            .iter()
            .filter(|entry| entry.key().user_id == user_id && entry.key().period_start == period_start)
            .map(|entry| UsageRecord {
                resource: entry.key().resource.clone(),
                count: entry.value().load(Ordering::Acquire),
                period_start,
            })
            .collect();
        records.sort_by(|a, b| a.resource.cmp(&b.resource));
        Ok(records)
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let before = self.counters.len();
        self.counters.retain(|key, _| key.period_start >= cutoff);
        Ok(before.saturating_sub(self.counters.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(MemoryUsageStore::new());
        let key = CounterKey::new(UserId::new(), "ai_queries", Utc::now());

        let tasks: Vec<_> = (0..200)
            .map(|_| {
                let store = Arc::clone(&store);
                let key = key.clone();
                tokio::spawn(async move { store.increment(&key, 1).await.unwrap() })
            })
            .collect();
        let mut seen: Vec<u64> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        seen.sort_unstable();

        assert_eq!(store.get(&key).await.unwrap(), 200);
        assert_eq!(seen, (1..=200).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_purge_before_cutoff() {
        let store = MemoryUsageStore::new();
        let user = UserId::new();
        let old = Utc::now() - chrono::Duration::days(120);
        let now = Utc::now();
        store.increment(&CounterKey::new(user, "forum_posts", old), 3).await.unwrap();
        store.increment(&CounterKey::new(user, "forum_posts", now), 1).await.unwrap();

        assert_eq!(store.purge_before(now - chrono::Duration::days(30)).await.unwrap(), 1);
        let remaining = store.list(user, now).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].count, 1);
    }
}
