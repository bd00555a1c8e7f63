//! Inbound client events.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{SyncError, SyncResult};
use crate::room::MediaSource;
use crate::utils::sanitize_position;

/// Incoming WebSocket message envelope: `{"event": <name>, "data": <payload>}`.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    Join(JoinRequest),
    /// Kept as raw JSON so it can be forwarded verbatim; see [`SyncActionRequest::from_value`].
    SyncAction(Value),
    Leave(LeaveRequest),
    Heartbeat,
}

/// Request to enter a room.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JoinRequest {
    pub username: String,
    #[serde(deserialize_with = "room_id")]
    pub room: String,
}

/// Request to leave a room.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LeaveRequest {
    #[serde(deserialize_with = "room_id")]
    pub room: String,
}

/// Reads a room id given either as a string or as a JSON number.
///
/// Numbers become their decimal string, so `42` and `"42"` name the same room.
fn room_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RoomId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RoomId::deserialize(deserializer)? {
        RoomId::Text(room) => room,
        RoomId::Number(n) => n.to_string(),
    })
}

/// Client intent to change playback, loop, or queue state.
///
/// Missing optional fields are defaulted by the state machine, never rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncAction {
    Play {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<f64>,
    },
    Pause {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<f64>,
    },
    Seek {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<f64>,
    },
    LoopToggle {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<bool>,
    },
    ChangeLink {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<MediaSource>,
    },
    QueueAdd {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    SongEnded,
    Skip,
}

/// Wire names of every [`SyncAction`] variant.
const ACTION_TYPES: [&str; 8] = [
    "play",
    "pause",
    "seek",
    "loop_toggle",
    "change_link",
    "queue_add",
    "song_ended",
    "skip",
];

impl SyncAction {
    /// Returns the wire name of the action.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Play { .. } => "play",
            Self::Pause { .. } => "pause",
            Self::Seek { .. } => "seek",
            Self::LoopToggle { .. } => "loop_toggle",
            Self::ChangeLink { .. } => "change_link",
            Self::QueueAdd { .. } => "queue_add",
            Self::SongEnded => "song_ended",
            Self::Skip => "skip",
        }
    }
}

/// A parsed `sync_action` together with its original payload.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncActionRequest {
    /// Target room.
    pub room: String,
    /// Typed action.
    pub action: SyncAction,
    /// Payload as received, re-emitted verbatim for forwarded actions.
    pub raw: Value,
}

impl SyncActionRequest {
    /// Builds a request from a typed action, synthesizing the raw payload.
    ///
    /// Positions are clamped first so the forwarded payload matches what the
    /// room stores.
    pub fn new(room: impl Into<String>, mut action: SyncAction) -> Self {
        let room = room.into();
        if let SyncAction::Play { value: Some(v) }
        | SyncAction::Pause { value: Some(v) }
        | SyncAction::Seek { value: Some(v) } = &mut action
        {
            *v = sanitize_position(*v);
        }
        let mut raw =
            serde_json::to_value(&action).unwrap_or_else(|_| Value::Object(Default::default()));
        if let Value::Object(ref mut map) = raw {
            map.insert("room".to_string(), Value::String(room.clone()));
        }
        Self { room, action, raw }
    }

    /// Parses a raw `sync_action` payload.
    ///
    /// Numeric room ids are accepted and converted to their decimal string.
    ///
    /// # Errors
    ///
    /// - [`SyncError::MissingRoom`] if `room` is absent or not a string/number
    /// - [`SyncError::UnknownAction`] if `type` is not one of the eight action kinds
    /// - [`SyncError::InvalidPayload`] if a field has the wrong type or a
    ///   play/pause/seek position is negative
    pub fn from_value(raw: Value) -> SyncResult<Self> {
        if !raw.is_object() {
            return Err(SyncError::InvalidPayload(
                "sync_action payload must be an object".into(),
            ));
        }

        let room = raw
            .get("room")
            .and_then(|room| room_id(room).ok())
            .ok_or(SyncError::MissingRoom)?;

        let kind = raw
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| SyncError::InvalidPayload("sync_action is missing `type`".into()))?;
        if !ACTION_TYPES.contains(&kind) {
            return Err(SyncError::UnknownAction(kind.to_string()));
        }

        let action = SyncAction::deserialize(&raw)?;
        if let SyncAction::Play { value: Some(v) }
        | SyncAction::Pause { value: Some(v) }
        | SyncAction::Seek { value: Some(v) } = &action
        {
            if !v.is_finite() || *v < 0.0 {
                return Err(SyncError::InvalidPayload(
                    "position must be a non-negative number".into(),
                ));
            }
        }

        Ok(Self { room, action, raw })
    }
}
