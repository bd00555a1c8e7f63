//! Pure room state transitions.
//!
//! Every function here takes the current state, the event, and the instant it
//! is applied at, mutates the state in place, and returns the outbound events
//! the room must see. Nothing here reads the clock, takes a lock, or performs
//! I/O; [`SyncRouter`](super::SyncRouter) does that around these calls.

use crate::events::{Outbound, ServerEvent, SyncActionBroadcast, SynthesizedAction};
use crate::protocol_constants::{JOIN_NOTICE_SUFFIX, LEAVE_NOTICE_SUFFIX};
use crate::room::{MediaSource, RoomState};
use crate::sync::action::{SyncAction, SyncActionRequest};

/// Produces the late-join snapshot for the joiner and the room-wide notice.
pub fn apply_join(state: &mut RoomState, room: &str, username: &str, now: u64) -> Vec<Outbound> {
    state.touch(now);
    vec![
        Outbound::private(ServerEvent::SyncState(state.snapshot(now))),
        Outbound::room(room, ServerEvent::status(format!("{username}{JOIN_NOTICE_SUFFIX}"))),
    ]
}

/// Produces the room-wide notice for a member leaving.
pub fn apply_leave(state: &mut RoomState, room: &str, username: &str, now: u64) -> Vec<Outbound> {
    state.touch(now);
    vec![Outbound::room(
        room,
        ServerEvent::status(format!("{username}{LEAVE_NOTICE_SUFFIX}")),
    )]
}

/// Applies one client action to the room.
pub fn apply_action(state: &mut RoomState, request: &SyncActionRequest, now: u64) -> Vec<Outbound> {
    state.touch(now);
    let room = request.room.as_str();

    match &request.action {
        SyncAction::Play { value } => {
            let position = value.unwrap_or(state.position_anchor);
            state.set_playing(true, position, now);
            forward(request)
        }
        SyncAction::Pause { value } => {
            let position = value.unwrap_or(state.position_anchor);
            state.set_playing(false, position, now);
            forward(request)
        }
        SyncAction::Seek { value } => {
            state.reanchor(value.unwrap_or(0.0), now);
            forward(request)
        }
        SyncAction::LoopToggle { value } => {
            state.is_looping = value.unwrap_or(false);
            forward(request)
        }
        SyncAction::ChangeLink { value, source } => {
            state.load(
                value.clone().unwrap_or_default(),
                source.clone().unwrap_or_default(),
                now,
            );
            forward(request)
        }
        SyncAction::QueueAdd { value } => match value.as_deref() {
            Some(id) if !id.is_empty() => {
                state.queue.push_back(id.to_string());
                vec![queue_update(state, room)]
            }
            _ => Vec::new(),
        },
        SyncAction::SongEnded if state.is_looping => replay(state, room, now),
        SyncAction::SongEnded | SyncAction::Skip => advance_queue(state, room, now),
    }
}

/// Re-emits the client's payload to the whole room.
fn forward(request: &SyncActionRequest) -> Vec<Outbound> {
    vec![Outbound::room(
        &request.room,
        ServerEvent::SyncAction(SyncActionBroadcast::Forwarded(request.raw.clone())),
    )]
}

fn queue_update(state: &RoomState, room: &str) -> Outbound {
    Outbound::room(room, ServerEvent::QueueUpdate(state.queue_snapshot()))
}

/// Restarts the current item; link and queue stay as they are.
fn replay(state: &mut RoomState, room: &str, now: u64) -> Vec<Outbound> {
    state.set_playing(true, 0.0, now);
    vec![Outbound::room(
        room,
        ServerEvent::SyncAction(SyncActionBroadcast::Synthesized(SynthesizedAction::Seek {
            value: 0.0,
            is_replay: true,
            room: room.to_string(),
        })),
    )]
}

/// Moves the queue head into the player. Nothing happens on an empty queue.
fn advance_queue(state: &mut RoomState, room: &str, now: u64) -> Vec<Outbound> {
    let Some(next) = state.pop_next() else {
        return Vec::new();
    };

    // Queued items carry no source tag; they are always YouTube ids.
    state.load(next.clone(), MediaSource::Youtube, now);

    vec![
        Outbound::room(
            room,
            ServerEvent::SyncAction(SyncActionBroadcast::Synthesized(
                SynthesizedAction::ChangeLink {
                    value: next,
                    source: MediaSource::Youtube,
                    room: room.to_string(),
                },
            )),
        ),
        queue_update(state, room),
    ]
}
