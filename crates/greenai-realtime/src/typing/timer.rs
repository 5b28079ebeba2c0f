//! Keyed one-shot timers with cancel-and-reschedule.
//!
//! At most one timer is pending per key. Scheduling a key again aborts the
//! previous task. Every timer carries a generation number so a callback that
//! slipped past an abort can be recognised as stale by its owner.

use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::JoinHandle;

#[derive(Debug)]
struct TimerEntry {
    generation: u64,
    handle: JoinHandle<()>,
}

/// One-shot timers keyed by `K`.
#[derive(Debug)]
pub struct KeyedTimers<K>
where
    K: Eq + Hash,
{
    entries: Arc<DashMap<K, TimerEntry>>,
    next_generation: AtomicU64,
}

impl<K> KeyedTimers<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    /// Creates an empty timer set.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Schedules `on_fire` after `delay`, replacing any pending timer for `key`.
    ///
    /// Returns the generation handed to `on_fire`.
    pub fn schedule<F>(&self, key: K, delay: Duration, on_fire: F) -> u64
    where
        F: FnOnce(u64) + Send + 'static,
    {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let entries = Arc::clone(&self.entries);
        let task_key = key.clone();

        // Holding the slot keeps the new task from clearing it before insertion.
        let slot = self.entries.entry(key);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let current = entries
                .remove_if(&task_key, |_, entry| entry.generation == generation)
                .is_some();
            if current {
                on_fire(generation);
            }
        });

        let entry = TimerEntry { generation, handle };
        match slot {
            Entry::Occupied(mut occupied) => {
                let previous = occupied.insert(entry);
                previous.handle.abort();
            }
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
            }
        }
        generation
    }

    /// Cancels the pending timer for `key`. Returns whether one was pending.
    pub fn cancel(&self, key: &K) -> bool {
        match self.entries.remove(key) {
            Some((_, entry)) => {
                entry.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancels every pending timer.
    pub fn cancel_all(&self) -> usize {
        let keys: Vec<K> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.iter().filter(|key| self.cancel(key)).count()
    }

    /// Whether a timer is pending for `key`.
    pub fn is_pending(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of pending timers.
    pub fn pending(&self) -> usize {
        self.entries.len()
    }
}

impl<K> Default for KeyedTimers<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_delay() {
        let timers = KeyedTimers::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        timers.schedule("k", Duration::from_secs(5), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timers.is_pending(&"k"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_pending_timer() {
        let timers = KeyedTimers::new();
        let fired = Arc::new(std::sync::Mutex::new(Vec::new()));

        let log = Arc::clone(&fired);
        let first = timers.schedule("k", Duration::from_secs(5), move |g| {
            log.lock().unwrap().push(g);
        });
        tokio::time::sleep(Duration::from_secs(4)).await;
        let log = Arc::clone(&fired);
        let second = timers.schedule("k", Duration::from_secs(5), move |g| {
            log.lock().unwrap().push(g);
        });
        assert!(second > first);
        assert_eq!(timers.pending(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(fired.lock().unwrap().is_empty());
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(*fired.lock().unwrap(), vec![second]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_fire() {
        let timers = KeyedTimers::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        timers.schedule(1u32, Duration::from_secs(1), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(timers.cancel(&1));
        assert!(!timers.cancel(&1));
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(timers.cancel_all(), 0);
    }
}
