//! Playback position extrapolation.

use crate::room::state::RoomState;
use crate::utils::millis_to_secs;

/// Returns the playback offset (seconds) the room's timeline shows at `now`.
///
/// A paused room reports its anchor unchanged. A playing room adds the time
/// elapsed since `last_update`; a `now` earlier than `last_update` (clock
/// skew) contributes nothing rather than a negative amount.
#[must_use]
pub fn effective_position(state: &RoomState, now: u64) -> f64 {
    if !state.is_playing {
        return state.position_anchor;
    }
    state.position_anchor + millis_to_secs(now.saturating_sub(state.last_update))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing_at(anchor: f64, last_update: u64) -> RoomState {
        RoomState {
            is_playing: true,
            position_anchor: anchor,
            last_update,
            ..RoomState::default()
        }
    }

    #[test]
    fn playing_room_advances_with_wall_clock() {
        let room = playing_at(10.0, 1_000);
        assert_eq!(effective_position(&room, 6_000), 15.0);
    }

    #[test]
    fn elapsed_difference_matches_wall_clock_difference() {
        let room = playing_at(3.25, 10_000);
        for (t1, t2) in [(10_000, 10_000), (10_000, 12_500), (11_000, 71_000)] {
            let delta = effective_position(&room, t2) - effective_position(&room, t1);
            assert!((delta - millis_to_secs(t2 - t1)).abs() < 1e-9);
        }
    }

    #[test]
    fn paused_room_is_frozen() {
        let room = RoomState {
            is_playing: false,
            position_anchor: 42.0,
            last_update: 1_000,
            ..RoomState::default()
        };
        for now in [0, 1_000, 50_000, u64::MAX] {
            assert_eq!(effective_position(&room, now), 42.0);
        }
    }

    #[test]
    fn clock_skew_never_rewinds() {
        let room = playing_at(8.0, 5_000);
        assert_eq!(effective_position(&room, 4_000), 8.0);
    }
}
