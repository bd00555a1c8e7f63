//! Routes client events to their room's state machine.

use std::sync::Arc;

use crate::clock::Clock;
use crate::error::{ErrorCode, SyncError};
use crate::events::{Broadcaster, Outbound, ServerEvent};
use crate::room::{MediaSource, RoomRegistry};
use crate::sync::action::{JoinRequest, SyncAction, SyncActionRequest};
use crate::sync::machine;

/// Applies client events to rooms and delivers the resulting broadcasts.
///
/// Each event is processed while holding only its own room's lock: the
/// state is mutated and every resulting message handed to the
/// [`Broadcaster`] before the lock is released. Broadcast order therefore
/// matches mutation order within a room, and rooms never wait on each other.
///
/// Every entry point also returns the delivered messages so callers can
/// inspect them without a broadcaster of their own.
pub struct SyncRouter {
    registry: Arc<RoomRegistry>,
    broadcaster: Arc<dyn Broadcaster>,
    clock: Arc<dyn Clock>,
    report_unknown_room: bool,
}

impl SyncRouter {
    /// Creates a router over `registry`.
    ///
    /// With `report_unknown_room`, actions for rooms that were never joined
    /// get a private `error` reply; otherwise they are dropped silently.
    pub fn new(
        registry: Arc<RoomRegistry>,
        broadcaster: Arc<dyn Broadcaster>,
        clock: Arc<dyn Clock>,
        report_unknown_room: bool,
    ) -> Self {
        Self {
            registry,
            broadcaster,
            clock,
            report_unknown_room,
        }
    }

    /// Returns the registry this router mutates.
    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Handles a join: creates the room if needed, sends the joiner the
    /// current state, and announces them to the room.
    ///
    /// Room membership must already include `origin` so the notice reaches
    /// the joiner as well.
    pub fn join(&self, origin: &str, request: &JoinRequest) -> Vec<Outbound> {
        let now = self.clock.now_millis();
        let handle = self.registry.get_or_create(&request.room, now);
        let mut state = handle.lock();

        let outbound = machine::apply_join(&mut state, &request.room, &request.username, now);
        log::info!(
            "[Router] {} joined room {} ({})",
            request.username,
            request.room,
            origin
        );
        self.deliver_all(origin, &outbound);
        outbound
    }

    /// Announces that `username` left `room`. Unknown rooms are ignored.
    pub fn leave(&self, origin: &str, room: &str, username: &str) -> Vec<Outbound> {
        let Some(handle) = self.registry.get(room) else {
            return Vec::new();
        };
        let now = self.clock.now_millis();
        let mut state = handle.lock();

        let outbound = machine::apply_leave(&mut state, room, username, now);
        log::info!("[Router] {} left room {} ({})", username, room, origin);
        self.deliver_all(origin, &outbound);
        outbound
    }

    /// Applies a parsed `sync_action`.
    ///
    /// Actions for rooms that do not exist leave the registry untouched and
    /// produce no room broadcast.
    pub fn sync_action(&self, origin: &str, request: &SyncActionRequest) -> Vec<Outbound> {
        let Some(handle) = self.registry.get(&request.room) else {
            return self.unknown_room(origin, request);
        };
        let now = self.clock.now_millis();
        let mut state = handle.lock();

        let outbound = machine::apply_action(&mut state, request, now);
        log::debug!(
            "[Router] {} in room {} from {}: {} message(s)",
            request.action.kind(),
            request.room,
            origin,
            outbound.len()
        );
        self.deliver_all(origin, &outbound);
        outbound
    }

    /// Resumes playback, optionally from `value` seconds.
    pub fn play(&self, origin: &str, room: &str, value: Option<f64>) -> Vec<Outbound> {
        self.typed(origin, room, SyncAction::Play { value })
    }

    /// Pauses playback, optionally at `value` seconds.
    pub fn pause(&self, origin: &str, room: &str, value: Option<f64>) -> Vec<Outbound> {
        self.typed(origin, room, SyncAction::Pause { value })
    }

    /// Moves the timeline to `value` seconds (0 when absent).
    pub fn seek(&self, origin: &str, room: &str, value: Option<f64>) -> Vec<Outbound> {
        self.typed(origin, room, SyncAction::Seek { value })
    }

    /// Sets whether the current item replays when it ends.
    pub fn loop_toggle(&self, origin: &str, room: &str, value: Option<bool>) -> Vec<Outbound> {
        self.typed(origin, room, SyncAction::LoopToggle { value })
    }

    /// Loads a new item and starts it from the beginning.
    pub fn change_link(
        &self,
        origin: &str,
        room: &str,
        value: Option<String>,
        source: Option<MediaSource>,
    ) -> Vec<Outbound> {
        self.typed(origin, room, SyncAction::ChangeLink { value, source })
    }

    /// Appends an item to the queue.
    pub fn queue_add(&self, origin: &str, room: &str, value: Option<String>) -> Vec<Outbound> {
        self.typed(origin, room, SyncAction::QueueAdd { value })
    }

    /// Reports that the current item finished playing naturally.
    pub fn song_ended(&self, origin: &str, room: &str) -> Vec<Outbound> {
        self.typed(origin, room, SyncAction::SongEnded)
    }

    /// Skips to the next queued item.
    pub fn skip(&self, origin: &str, room: &str) -> Vec<Outbound> {
        self.typed(origin, room, SyncAction::Skip)
    }

    fn typed(&self, origin: &str, room: &str, action: SyncAction) -> Vec<Outbound> {
        self.sync_action(origin, &SyncActionRequest::new(room, action))
    }

    fn unknown_room(&self, origin: &str, request: &SyncActionRequest) -> Vec<Outbound> {
        log::debug!(
            "[Router] Dropping {} for unknown room {} from {}",
            request.action.kind(),
            request.room,
            origin
        );
        if !self.report_unknown_room {
            return Vec::new();
        }
        let err = SyncError::RoomNotFound(request.room.clone());
        let outbound = vec![Outbound::private(ServerEvent::error(
            err.code(),
            err.to_string(),
        ))];
        self.deliver_all(origin, &outbound);
        outbound
    }

    fn deliver_all(&self, origin: &str, outbound: &[Outbound]) {
        for message in outbound {
            self.broadcaster.deliver(origin, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::events::{Delivery, SyncActionBroadcast, SynthesizedAction};
    use parking_lot::Mutex;
    use serde_json::json;

    const T0: u64 = 1_700_000_000_000;

    /// Records every delivery in order.
    #[derive(Default)]
    struct RecordingBroadcaster {
        delivered: Mutex<Vec<(String, Outbound)>>,
    }

    impl RecordingBroadcaster {
        fn take(&self) -> Vec<(String, Outbound)> {
            std::mem::take(&mut *self.delivered.lock())
        }
    }

    impl Broadcaster for RecordingBroadcaster {
        fn deliver(&self, origin: &str, outbound: &Outbound) {
            self.delivered
                .lock()
                .push((origin.to_string(), outbound.clone()));
        }
    }

    struct Harness {
        router: SyncRouter,
        clock: Arc<ManualClock>,
        sink: Arc<RecordingBroadcaster>,
    }

    fn harness(report_unknown_room: bool) -> Harness {
        let clock = Arc::new(ManualClock::new(T0));
        let sink = Arc::new(RecordingBroadcaster::default());
        let router = SyncRouter::new(
            Arc::new(RoomRegistry::new()),
            sink.clone(),
            clock.clone(),
            report_unknown_room,
        );
        Harness {
            router,
            clock,
            sink,
        }
    }

    fn join(h: &Harness, origin: &str, room: &str) -> Vec<Outbound> {
        h.router.join(
            origin,
            &JoinRequest {
                username: format!("user-{origin}"),
                room: room.to_string(),
            },
        )
    }

    #[test]
    fn late_joiner_receives_extrapolated_position() {
        let h = harness(false);
        join(&h, "ws-1", "movie");
        h.router.change_link("ws-1", "movie", Some("vid".into()), None);
        h.router.seek("ws-1", "movie", Some(10.0));

        h.clock.advance(5_000);
        let out = join(&h, "ws-2", "movie");

        match &out[0].event {
            ServerEvent::SyncState(snapshot) => {
                assert_eq!(snapshot.timestamp, 15.0);
                assert_eq!(snapshot.current_link, "vid");
                assert_eq!(snapshot.current_source, MediaSource::Youtube);
            }
            other => panic!("expected sync_state, got {other:?}"),
        }
    }

    #[test]
    fn negative_seek_broadcasts_the_stored_position() {
        let h = harness(false);
        join(&h, "ws-1", "movie");
        h.sink.take();

        let out = h.router.seek("ws-1", "movie", Some(-10.0));

        match &out[0].event {
            ServerEvent::SyncAction(SyncActionBroadcast::Forwarded(raw)) => {
                assert_eq!(raw["value"], json!(0.0));
            }
            other => panic!("expected forwarded sync_action, got {other:?}"),
        }
        let snapshot = h.router.registry().snapshot("movie", h.clock.now_millis()).unwrap();
        assert_eq!(snapshot.timestamp, 0.0);
    }

    #[test]
    fn paused_room_snapshot_does_not_advance() {
        let h = harness(false);
        join(&h, "ws-1", "movie");
        h.router.pause("ws-1", "movie", Some(42.0));

        h.clock.advance(60_000);
        let snapshot = h.router.registry().snapshot("movie", h.clock.now_millis()).unwrap();

        assert_eq!(snapshot.timestamp, 42.0);
        assert!(!snapshot.is_playing);
    }

    #[test]
    fn actions_for_unknown_room_are_dropped() {
        let h = harness(false);

        let out = h.router.play("ws-1", "nowhere", Some(3.0));

        assert!(out.is_empty());
        assert!(h.sink.take().is_empty());
        assert!(h.router.registry().is_empty());
    }

    #[test]
    fn unknown_room_can_be_reported_privately() {
        let h = harness(true);

        let out = h.router.skip("ws-1", "nowhere");

        assert_eq!(
            out,
            vec![Outbound::private(ServerEvent::error(
                "room_not_found",
                "Room not found: nowhere"
            ))]
        );
        assert_eq!(h.sink.take().len(), 1);
        assert!(h.router.registry().is_empty());
    }

    #[test]
    fn join_delivers_snapshot_then_notice() {
        let h = harness(false);

        join(&h, "ws-1", "movie");

        let delivered = h.sink.take();
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].0, "ws-1");
        assert_eq!(delivered[0].1.delivery, Delivery::Private);
        assert_eq!(
            delivered[1].1,
            Outbound::room("movie", ServerEvent::status("user-ws-1 has entered the room."))
        );
    }

    #[test]
    fn queue_advance_broadcasts_in_order() {
        let h = harness(false);
        join(&h, "ws-1", "movie");
        h.router.queue_add("ws-1", "movie", Some("a".into()));
        h.router.queue_add("ws-2", "movie", Some("b".into()));
        h.sink.take();

        h.router.song_ended("ws-1", "movie");

        let events: Vec<ServerEvent> = h.sink.take().into_iter().map(|(_, o)| o.event).collect();
        assert_eq!(
            events,
            vec![
                ServerEvent::SyncAction(SyncActionBroadcast::Synthesized(
                    SynthesizedAction::ChangeLink {
                        value: "a".into(),
                        source: MediaSource::Youtube,
                        room: "movie".into(),
                    }
                )),
                ServerEvent::QueueUpdate(vec!["b".into()]),
            ]
        );
        let state = h.router.registry().get("movie").unwrap();
        assert_eq!(state.lock().link, "a");
    }

    #[test]
    fn raw_payload_is_forwarded_to_room() {
        let h = harness(false);
        join(&h, "ws-1", "movie");
        h.sink.take();

        let raw = json!({"room": "movie", "type": "pause", "value": 7, "extra": [1, 2]});
        let request = SyncActionRequest::from_value(raw.clone()).unwrap();
        h.router.sync_action("ws-1", &request);

        assert_eq!(
            h.sink.take(),
            vec![(
                "ws-1".to_string(),
                Outbound::room("movie", ServerEvent::SyncAction(SyncActionBroadcast::Forwarded(raw)))
            )]
        );
    }

    #[test]
    fn leave_announces_only_for_existing_rooms() {
        let h = harness(false);
        assert!(h.router.leave("ws-1", "movie", "ann").is_empty());

        join(&h, "ws-1", "movie");
        let out = h.router.leave("ws-1", "movie", "ann");
        assert_eq!(
            out,
            vec![Outbound::room("movie", ServerEvent::status("ann has left the room."))]
        );
    }

    #[test]
    fn actions_refresh_room_activity() {
        let h = harness(false);
        join(&h, "ws-1", "movie");
        h.clock.advance(30_000);

        h.router.loop_toggle("ws-1", "movie", Some(true));

        let room = h.router.registry().get("movie").unwrap();
        assert_eq!(room.lock().last_activity, T0 + 30_000);
    }

    #[test]
    fn rooms_are_isolated() {
        let h = harness(false);
        join(&h, "ws-1", "a");
        join(&h, "ws-2", "b");

        h.router.change_link("ws-1", "a", Some("only-a".into()), Some(MediaSource::Spotify));

        let registry = h.router.registry();
        assert_eq!(registry.get("a").unwrap().lock().link, "only-a");
        assert_eq!(registry.get("b").unwrap().lock().link, "");
    }
}
