//! Typing coordinator: who is typing in which room.
//!
//! Per (user, room) the state is either not typing or typing. Entering the
//! typing state broadcasts once; repeated starts only push the auto-stop
//! deadline back. Leaving it (explicit stop, timeout, leave, disconnect)
//! broadcasts once.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, warn};

use greenai_core::types::{RoomId, UserId};

use crate::message::types::OutboundMessage;
use crate::room::manager::{Exclude, RoomManager};

use super::timer::KeyedTimers;

#[derive(Debug)]
struct TypingEntry {
    username: String,
    /// Generation of the auto-stop timer that may clear this entry.
    generation: u64,
}

#[derive(Debug)]
struct Inner {
    /// Room ID → typing users. Entries are never empty.
    typing: DashMap<RoomId, HashMap<UserId, TypingEntry>>,
    timers: KeyedTimers<(UserId, RoomId)>,
    rooms: Arc<RoomManager>,
    timeout: Duration,
}

/// Tracks typing users per room and clears them on timeout.
///
/// Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct TypingCoordinator {
    inner: Arc<Inner>,
}

impl TypingCoordinator {
    /// Creates a coordinator with the given auto-stop timeout.
    pub fn new(rooms: Arc<RoomManager>, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                typing: DashMap::new(),
                timers: KeyedTimers::new(),
                rooms,
                timeout,
            }),
        }
    }

    /// Marks the user as typing and (re)arms the auto-stop timer.
    ///
    /// Returns `true` if the user was not typing before.
    pub fn start_typing(&self, user_id: UserId, username: &str, room_id: &RoomId) -> bool {
        if !self.inner.rooms.contains(room_id) {
            warn!(user_id = %user_id, room_id = %room_id, "Typing in unknown room");
            return false;
        }

        let mut room = self.inner.typing.entry(room_id.clone()).or_default();
        let coordinator = self.clone();
        let timer_room = room_id.clone();
        let generation = self.inner.timers.schedule(
            (user_id, room_id.clone()),
            self.inner.timeout,
            move |generation| {
                coordinator.expire(user_id, &timer_room, generation);
            },
        );

        let fresh = room
            .insert(
                user_id,
                TypingEntry {
                    username: username.to_string(),
                    generation,
                },
            )
            .is_none();

        if fresh {
            self.announce(user_id, username, room_id, true);
            debug!(user_id = %user_id, room_id = %room_id, "Typing started");
        }
        fresh
    }

    /// Clears the user's typing state in a room.
    ///
    /// Returns `true` if the user was typing; a second call is a silent no-op.
    pub fn stop_typing(&self, user_id: UserId, room_id: &RoomId) -> bool {
        self.clear(user_id, room_id, None)
    }

    /// Clears the user from every room they are typing in.
    ///
    /// Returns the rooms a stop was broadcast to.
    pub fn clear_user(&self, user_id: UserId) -> Vec<RoomId> {
        let rooms: Vec<RoomId> = self
            .inner
            .typing
            .iter()
            .filter(|entry| entry.value().contains_key(&user_id))
            .map(|entry| entry.key().clone())
            .collect();

        rooms
            .into_iter()
            .filter(|room_id| self.stop_typing(user_id, room_id))
            .collect()
    }

    /// Whether the user is typing in the room.
    pub fn is_typing(&self, user_id: &UserId, room_id: &RoomId) -> bool {
        self.inner
            .typing
            .get(room_id)
            .map(|users| users.contains_key(user_id))
            .unwrap_or(false)
    }

    /// Users currently typing in the room.
    pub fn typing_in(&self, room_id: &RoomId) -> Vec<UserId> {
        self.inner
            .typing
            .get(room_id)
            .map(|users| users.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Number of pending auto-stop timers.
    pub fn pending_timers(&self) -> usize {
        self.inner.timers.pending()
    }

    /// Drops all typing state and timers without broadcasting.
    pub fn shutdown(&self) {
        let cancelled = self.inner.timers.cancel_all();
        self.inner.typing.clear();
        debug!(cancelled = cancelled, "Typing coordinator stopped");
    }

    /// Auto-stop: clears the entry only if it still belongs to `generation`.
    fn expire(&self, user_id: UserId, room_id: &RoomId, generation: u64) {
        if self.clear(user_id, room_id, Some(generation)) {
            debug!(user_id = %user_id, room_id = %room_id, "Typing timed out");
        }
    }

    fn clear(&self, user_id: UserId, room_id: &RoomId, generation: Option<u64>) -> bool {
        let Entry::Occupied(mut room) = self.inner.typing.entry(room_id.clone()) else {
            return false;
        };

        let current = room
            .get()
            .get(&user_id)
            .map(|entry| generation.is_none_or(|g| g == entry.generation))
            .unwrap_or(false);
        if !current {
            return false;
        }

        let Some(entry) = room.get_mut().remove(&user_id) else {
            return false;
        };
        if generation.is_none() {
            self.inner.timers.cancel(&(user_id, room_id.clone()));
        }
        self.announce(user_id, &entry.username, room_id, false);
        if room.get().is_empty() {
            room.remove();
        }
        true
    }

    fn announce(&self, user_id: UserId, username: &str, room_id: &RoomId, is_typing: bool) {
        let message = OutboundMessage::UserTyping {
            user_id,
            username: username.to_string(),
            room_id: room_id.clone(),
            is_typing,
        };
        self.inner
            .rooms
            .broadcast(room_id, &message, Exclude::User(user_id));
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use greenai_core::types::{ConnectionId, UserRole, VerifiedIdentity};

    use super::*;
    use crate::connection::handle::ConnectionMeta;
    use crate::connection::registry::ConnectionRegistry;

    struct Fixture {
        registry: Arc<ConnectionRegistry>,
        rooms: Arc<RoomManager>,
        typing: TypingCoordinator,
        room: RoomId,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(ConnectionRegistry::new());
        let rooms = Arc::new(RoomManager::new(registry.clone()));
        let typing = TypingCoordinator::new(rooms.clone(), Duration::from_secs(5));
        Fixture {
            registry,
            rooms,
            typing,
            room: RoomId::new("topic-42"),
        }
    }

    fn join(fx: &Fixture, user_id: UserId) -> (ConnectionId, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(32);
        let identity = VerifiedIdentity {
            user_id,
            username: "typist".to_string(),
            role: UserRole::Farmer,
            is_verified: true,
        };
        let reg = fx.registry.register(identity, ConnectionMeta::default(), tx);
        fx.rooms.join(reg.handle.id, &fx.room);
        (reg.handle.id, rx)
    }

    fn typing_events(rx: &mut mpsc::Receiver<OutboundMessage>) -> Vec<bool> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let OutboundMessage::UserTyping { is_typing, .. } = msg {
                out.push(is_typing);
            }
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_stop_broadcasts_once() {
        let fx = fixture();
        let typist = UserId::new();
        let (_a, mut rx_a) = join(&fx, typist);
        let (_b, mut rx_b) = join(&fx, UserId::new());

        assert!(fx.typing.start_typing(typist, "typist", &fx.room));
        assert!(fx.typing.stop_typing(typist, &fx.room));
        assert!(!fx.typing.stop_typing(typist, &fx.room));

        assert_eq!(typing_events(&mut rx_b), vec![true, false]);
        assert!(typing_events(&mut rx_a).is_empty());
        assert_eq!(fx.typing.pending_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_start_does_not_rebroadcast() {
        let fx = fixture();
        let typist = UserId::new();
        let (_a, _rx_a) = join(&fx, typist);
        let (_b, mut rx_b) = join(&fx, UserId::new());

        assert!(fx.typing.start_typing(typist, "typist", &fx.room));
        assert!(!fx.typing.start_typing(typist, "typist", &fx.room));
        assert_eq!(fx.typing.typing_in(&fx.room), vec![typist]);
        assert_eq!(typing_events(&mut rx_b), vec![true]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_clears_and_restart_resets_window() {
        let fx = fixture();
        let typist = UserId::new();
        let (_a, _rx_a) = join(&fx, typist);
        let (_b, mut rx_b) = join(&fx, UserId::new());

        fx.typing.start_typing(typist, "typist", &fx.room);
        tokio::time::sleep(Duration::from_secs(4)).await;
        fx.typing.start_typing(typist, "typist", &fx.room);

        // Original 5 s mark passes without a stop.
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert!(fx.typing.is_typing(&typist, &fx.room));
        assert_eq!(typing_events(&mut rx_b), vec![true]);

        // 5 s after the restart the stop arrives.
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(!fx.typing.is_typing(&typist, &fx.room));
        assert_eq!(typing_events(&mut rx_b), vec![false]);
        assert_eq!(fx.typing.pending_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_user_covers_every_room() {
        let fx = fixture();
        let typist = UserId::new();
        let (a, _rx_a) = join(&fx, typist);
        let other_room = RoomId::new("topic-43");
        fx.rooms.join(a, &other_room);

        fx.typing.start_typing(typist, "typist", &fx.room);
        fx.typing.start_typing(typist, "typist", &other_room);

        let mut cleared = fx.typing.clear_user(typist);
        cleared.sort();
        assert_eq!(cleared, vec![fx.room.clone(), other_room]);
        assert!(fx.typing.clear_user(typist).is_empty());
        assert_eq!(fx.typing.pending_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_room_is_ignored() {
        let fx = fixture();
        assert!(!fx.typing.start_typing(UserId::new(), "nobody", &RoomId::new("empty")));
        assert_eq!(fx.typing.pending_timers(), 0);
    }
}
