//! In-memory notification store.

use async_trait::async_trait;
use dashmap::DashMap;

use greenai_core::result::AppResult;
use greenai_core::traits::NotificationStore;
use greenai_core::types::{NotificationEnvelope, NotificationId, NotificationQuery, UserId};

/// Keeps every user's notifications in memory, oldest first.
#[derive(Debug, Default)]
pub struct MemoryNotificationStore {
    by_user: DashMap<UserId, Vec<NotificationEnvelope>>,
}

impl MemoryNotificationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total stored notifications.
    pub fn len(&self) -> usize {
        self.by_user.iter().map(|entry| entry.value().len()).sum()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn save(&self, envelope: &NotificationEnvelope) -> AppResult<()> {
        let mut items = self.by_user.entry(envelope.target_user_id).or_default();
        match items.iter_mut().find(|n| n.id == envelope.id) {
            Some(existing) => *existing = envelope.clone(),
            None => items.push(envelope.clone()),
        }
        Ok(())
    }

    async fn find(&self, query: &NotificationQuery) -> AppResult<Vec<NotificationEnvelope>> {
        let Some(items) = self.by_user.get(&query.user_id) else {
            return Ok(Vec::new());
        };
        let mut matching: Vec<NotificationEnvelope> = items
            .iter()
            .filter(|n| !query.unread_only || !n.is_read)
            .cloned()
            .collect();
        drop(items);

        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching
            .into_iter()
            .skip(query.offset())
            .take(query.limit)
            .collect())
    }

    async fn mark_read(&self, user_id: UserId, id: NotificationId) -> AppResult<bool> {
        let Some(mut items) = self.by_user.get_mut(&user_id) else {
            return Ok(false);
        };
        match items.iter_mut().find(|n| n.id == id) {
            Some(n) if !n.is_read => {
                n.is_read = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn unread_count(&self, user_id: UserId) -> AppResult<u64> {
        Ok(self
            .by_user
            .get(&user_id)
            .map(|items| items.iter().filter(|n| !n.is_read).count() as u64)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use greenai_core::types::NotificationKind;

    use super::*;

    #[tokio::test]
    async fn test_find_newest_first_with_paging() {
        let store = MemoryNotificationStore::new();
        let user = UserId::new();
        for i in 0..5 {
            let mut n = NotificationEnvelope::new(NotificationKind::Like, user, "Like", format!("#{i}"));
            n.created_at += Duration::seconds(i);
            store.save(&n).await.unwrap();
        }

        let first = store.find(&NotificationQuery::page(user, 1, 2)).await.unwrap();
        assert_eq!(first.iter().map(|n| n.message.as_str()).collect::<Vec<_>>(), ["#4", "#3"]);
        let last = store.find(&NotificationQuery::page(user, 3, 2)).await.unwrap();
        assert_eq!(last.len(), 1);
    }

    #[tokio::test]
    async fn test_mark_read_is_scoped_to_owner() {
        let store = MemoryNotificationStore::new();
        let owner = UserId::new();
        let n = NotificationEnvelope::new(NotificationKind::Reply, owner, "Reply", "New reply");
        store.save(&n).await.unwrap();

        assert!(!store.mark_read(UserId::new(), n.id).await.unwrap());
        assert_eq!(store.unread_count(owner).await.unwrap(), 1);
        assert!(store.mark_read(owner, n.id).await.unwrap());
        assert!(!store.mark_read(owner, n.id).await.unwrap());
        assert_eq!(store.unread_count(owner).await.unwrap(), 0);
        assert!(store.find(&NotificationQuery::unread(owner, 10)).await.unwrap().is_empty());
    }
}
