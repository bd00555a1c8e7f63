//! Room playback record.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::room::extrapolate::effective_position;
use crate::utils::sanitize_position;

/// Media provider tag for the current item.
///
/// Clients may send any tag; unrecognized ones are carried through verbatim
/// so that newer clients can introduce providers without a server release.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MediaSource {
    /// YouTube video id.
    #[default]
    Youtube,
    /// Spotify track id.
    Spotify,
    /// Any other provider tag.
    Other(String),
}

impl MediaSource {
    /// Returns the wire representation of the tag.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Youtube => "youtube",
            Self::Spotify => "spotify",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for MediaSource {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "youtube" => Self::Youtube,
            "spotify" => Self::Spotify,
            _ => Self::Other(tag),
        }
    }
}

impl From<MediaSource> for String {
    fn from(source: MediaSource) -> Self {
        match source {
            MediaSource::Other(tag) => tag,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Playback state shared by every member of a room.
///
/// `position_anchor` is only meaningful together with `last_update`: it is
/// the offset (seconds) the timeline had at that wall-clock instant. Use
/// [`effective_position`] to read the position at any other instant.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomState {
    /// Provider of the current media item.
    pub source: MediaSource,
    /// Identifier of the current media item (empty until one is loaded).
    pub link: String,
    /// Whether the timeline is advancing.
    pub is_playing: bool,
    /// Playback offset in seconds as of `last_update`.
    pub position_anchor: f64,
    /// Unix milliseconds at which `position_anchor` was recorded.
    pub last_update: u64,
    /// Whether the current item replays when it ends naturally.
    pub is_looping: bool,
    /// Upcoming media identifiers, head first.
    pub queue: VecDeque<String>,
    /// Unix milliseconds of the last event routed to this room.
    pub last_activity: u64,
}

impl Default for RoomState {
    fn default() -> Self {
        Self {
            source: MediaSource::Youtube,
            link: String::new(),
            is_playing: false,
            position_anchor: 0.0,
            last_update: 0,
            is_looping: false,
            queue: VecDeque::new(),
            last_activity: 0,
        }
    }
}

impl RoomState {
    /// Creates a room in its initial shape, stamped as active at `now`.
    pub fn new(now: u64) -> Self {
        Self {
            last_activity: now,
            ..Self::default()
        }
    }

    /// Re-anchors the timeline at `position` as of `now`.
    ///
    /// Every change to the anchor goes through here so that `last_update`
    /// can never drift from `position_anchor`.
    pub fn reanchor(&mut self, position: f64, now: u64) {
        self.position_anchor = sanitize_position(position);
        self.last_update = now;
    }

    /// Sets the playing flag, re-anchoring at `position` as of `now`.
    pub fn set_playing(&mut self, playing: bool, position: f64, now: u64) {
        self.is_playing = playing;
        self.reanchor(position, now);
    }

    /// Loads `link` from `source` and starts it from the beginning.
    pub fn load(&mut self, link: String, source: MediaSource, now: u64) {
        self.link = link;
        self.source = source;
        self.set_playing(true, 0.0, now);
    }

    /// Removes and returns the head of the queue, if any.
    pub fn pop_next(&mut self) -> Option<String> {
        self.queue.pop_front()
    }

    /// Returns the queue as an ordered list for broadcasting.
    pub fn queue_snapshot(&self) -> Vec<String> {
        self.queue.iter().cloned().collect()
    }

    /// Records that an event touched this room.
    pub fn touch(&mut self, now: u64) {
        self.last_activity = self.last_activity.max(now);
    }

    /// Builds the late-join view of this room at `now`.
    pub fn snapshot(&self, now: u64) -> RoomSnapshot {
        RoomSnapshot {
            current_source: self.source.clone(),
            current_link: self.link.clone(),
            is_playing: self.is_playing,
            timestamp: effective_position(self, now),
            is_looping: self.is_looping,
            queue: self.queue_snapshot(),
        }
    }
}

/// Room state as seen by a client joining at a given instant.
///
/// `timestamp` is the extrapolated effective position, not the stored anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub current_source: MediaSource,
    pub current_link: String,
    pub is_playing: bool,
    pub timestamp: f64,
    pub is_looping: bool,
    pub queue: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_room_has_documented_shape() {
        let room = RoomState::new(42);
        assert_eq!(room.source, MediaSource::Youtube);
        assert!(room.link.is_empty());
        assert!(!room.is_playing);
        assert_eq!(room.position_anchor, 0.0);
        assert!(!room.is_looping);
        assert!(room.queue.is_empty());
        assert_eq!(room.last_activity, 42);
    }

    #[test]
    fn reanchor_refreshes_last_update_and_clamps() {
        let mut room = RoomState::default();
        room.reanchor(-4.0, 900);
        assert_eq!(room.position_anchor, 0.0);
        assert_eq!(room.last_update, 900);
    }

    #[test]
    fn load_restarts_playback_from_zero() {
        let mut room = RoomState::default();
        room.set_playing(false, 73.0, 100);

        room.load("abc".into(), MediaSource::Spotify, 200);

        assert_eq!(room.link, "abc");
        assert_eq!(room.source, MediaSource::Spotify);
        assert!(room.is_playing);
        assert_eq!(room.position_anchor, 0.0);
        assert_eq!(room.last_update, 200);
    }

    #[test]
    fn media_source_round_trips_unknown_tags() {
        let source: MediaSource = serde_json::from_str("\"vimeo\"").unwrap();
        assert_eq!(source, MediaSource::Other("vimeo".into()));
        assert_eq!(serde_json::to_string(&source).unwrap(), "\"vimeo\"");
        assert_eq!(
            serde_json::to_string(&MediaSource::Youtube).unwrap(),
            "\"youtube\""
        );
    }

    #[test]
    fn snapshot_uses_wire_field_names() {
        let mut room = RoomState::default();
        room.queue.push_back("next".into());
        let json = serde_json::to_value(room.snapshot(0)).unwrap();
        assert_eq!(json["current_source"], "youtube");
        assert_eq!(json["current_link"], "");
        assert_eq!(json["is_playing"], false);
        assert_eq!(json["timestamp"], 0.0);
        assert_eq!(json["is_looping"], false);
        assert_eq!(json["queue"], serde_json::json!(["next"]));
    }

    #[test]
    fn touch_never_moves_backwards() {
        let mut room = RoomState::new(500);
        room.touch(300);
        assert_eq!(room.last_activity, 500);
        room.touch(700);
        assert_eq!(room.last_activity, 700);
    }
}
