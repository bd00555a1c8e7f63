//! Room registry with atomic lazy creation.
//!
//! Provides O(1) lookups by room id. Rooms are created on first join and
//! live until the process exits or the idle-room reaper reclaims them.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;

use crate::room::state::{RoomSnapshot, RoomState};

/// Shared handle to one room's state.
///
/// Every caller resolving the same room id receives a clone of the same
/// `Arc`, so `Arc::ptr_eq` identifies rooms.
pub type RoomHandle = Arc<Mutex<RoomState>>;

/// Condensed view of a room for listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room: String,
    /// Connected members; filled in by the transport, which owns membership.
    pub members: usize,
    pub link: String,
    pub is_playing: bool,
    pub queue_length: usize,
}

/// Process-wide mapping from room id to [`RoomState`].
///
/// Thread-safe; lazy creation uses the map's entry API so that concurrent
/// first joins for the same id observe a single initialized room.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<String, RoomHandle>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the room for `room_id`, creating it in its default shape if unknown.
    ///
    /// `now` stamps the activity time of a freshly created room.
    pub fn get_or_create(&self, room_id: &str, now: u64) -> RoomHandle {
        if let Some(existing) = self.rooms.get(room_id) {
            return Arc::clone(existing.value());
        }
        let handle = self
            .rooms
            .entry(room_id.to_string())
            .or_insert_with(|| {
                log::info!("[Registry] Room created: {}", room_id);
                Arc::new(Mutex::new(RoomState::new(now)))
            });
        Arc::clone(handle.value())
    }

    /// Returns the room for `room_id` without creating it.
    pub fn get(&self, room_id: &str) -> Option<RoomHandle> {
        self.rooms.get(room_id).map(|r| Arc::clone(r.value()))
    }

    /// Returns whether a room exists.
    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Returns the number of rooms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Returns whether the registry holds no rooms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Returns all room ids, sorted.
    pub fn room_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.rooms.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Returns the late-join view of a room at `now`, if it exists.
    pub fn snapshot(&self, room_id: &str, now: u64) -> Option<RoomSnapshot> {
        self.get(room_id).map(|room| room.lock().snapshot(now))
    }

    /// Lists every room, sorted by id.
    pub fn summaries(&self) -> Vec<RoomSummary> {
        let handles: Vec<(String, RoomHandle)> = self
            .rooms
            .iter()
            .map(|r| (r.key().clone(), Arc::clone(r.value())))
            .collect();

        let mut summaries: Vec<RoomSummary> = handles
            .into_iter()
            .map(|(room, handle)| {
                let state = handle.lock();
                RoomSummary {
                    room,
                    members: 0,
                    link: state.link.clone(),
                    is_playing: state.is_playing,
                    queue_length: state.queue.len(),
                }
            })
            .collect();
        summaries.sort_by(|a, b| a.room.cmp(&b.room));
        summaries
    }

    /// Removes rooms idle for longer than `ttl_ms` that `is_occupied` reports empty.
    ///
    /// Returns the ids of the removed rooms. A room touched or joined between
    /// the scan and the removal is kept.
    pub fn remove_idle<F>(&self, now: u64, ttl_ms: u64, is_occupied: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        let is_idle = |handle: &RoomHandle| {
            now.saturating_sub(handle.lock().last_activity) > ttl_ms
        };

        let candidates: Vec<String> = self
            .rooms
            .iter()
            .filter(|r| is_idle(r.value()) && !is_occupied(r.key().as_str()))
            .map(|r| r.key().clone())
            .collect();

        candidates
            .into_iter()
            .filter(|id| {
                self.rooms
                    .remove_if(id, |id, handle| is_idle(handle) && !is_occupied(id.as_str()))
                    .is_some()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::thread;

    #[test]
    fn get_or_create_is_idempotent() {
        let registry = RoomRegistry::new();

        let first = registry.get_or_create("lobby", 10);
        let second = registry.get_or_create("lobby", 20);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);

        let state = first.lock();
        assert_eq!(state.source.as_str(), "youtube");
        assert_eq!(state.link, "");
        assert!(!state.is_playing);
        assert_eq!(state.position_anchor, 0.0);
        assert!(!state.is_looping);
        assert_eq!(state.queue, VecDeque::<String>::new());
        assert_eq!(state.last_activity, 10);
    }

    #[test]
    fn get_does_not_create() {
        let registry = RoomRegistry::new();
        assert!(registry.get("ghost").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn independent_registries_do_not_share_rooms() {
        let a = RoomRegistry::new();
        let b = RoomRegistry::new();
        a.get_or_create("lobby", 0);
        assert!(b.get("lobby").is_none());
    }

    #[test]
    fn concurrent_first_joins_create_one_room() {
        let registry = Arc::new(RoomRegistry::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.get_or_create("race", 0))
            })
            .collect();

        let rooms: Vec<RoomHandle> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(registry.len(), 1);
        assert!(rooms.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn remove_idle_skips_active_and_occupied_rooms() {
        let registry = RoomRegistry::new();
        registry.get_or_create("stale", 0);
        registry.get_or_create("occupied", 0);
        registry.get_or_create("fresh", 9_000);

        let removed = registry.remove_idle(10_000, 5_000, |id| id == "occupied");

        assert_eq!(removed, vec!["stale".to_string()]);
        assert!(registry.contains("occupied"));
        assert!(registry.contains("fresh"));
        assert!(!registry.contains("stale"));
    }

    #[test]
    fn summaries_are_sorted_by_room() {
        let registry = RoomRegistry::new();
        registry.get_or_create("b", 0);
        registry
            .get_or_create("a", 0)
            .lock()
            .queue
            .push_back("x".into());

        let summaries = registry.summaries();
        assert_eq!(summaries[0].room, "a");
        assert_eq!(summaries[0].queue_length, 1);
        assert_eq!(summaries[1].room, "b");
        assert_eq!(registry.room_ids(), vec!["a".to_string(), "b".to_string()]);
    }
}
