//! Outbound event model for room members.
//!
//! This module provides:
//! - [`ServerEvent`]: every message the server sends to clients
//! - [`Outbound`] / [`Delivery`]: an event plus who should receive it
//! - [`Broadcaster`] trait for delivering outbound events
//! - [`BroadcastBridge`] for fanning deliveries out to an optional observer

mod bridge;
mod emitter;

pub use bridge::BroadcastBridge;
pub use emitter::{Broadcaster, LoggingBroadcaster};

use serde::Serialize;

use crate::room::{MediaSource, RoomSnapshot};

/// Events sent to clients.
///
/// Serialized as `{"event": <name>, "data": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full room state for a client that just joined.
    SyncState(RoomSnapshot),

    /// Human-readable room notice.
    Status(StatusPayload),

    /// Playback action every member must apply.
    SyncAction(SyncActionBroadcast),

    /// Current queue contents, head first.
    QueueUpdate(Vec<String>),

    /// A request from this client could not be applied.
    Error(ErrorPayload),

    /// Reply to a client heartbeat.
    HeartbeatAck,
}

/// Payload of a [`ServerEvent::Status`] notice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusPayload {
    pub msg: String,
}

/// Payload of a [`ServerEvent::Error`] reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPayload {
    /// Machine-readable error code.
    pub code: &'static str,
    /// Human-readable description.
    pub message: String,
}

/// A `sync_action` broadcast.
///
/// Client actions are re-emitted exactly as received, including fields the
/// server does not interpret. Actions the server decides on its own (loop
/// replay, queue advance) are built from scratch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SyncActionBroadcast {
    /// The client's original `sync_action` payload.
    Forwarded(serde_json::Value),
    /// An action produced by the server.
    Synthesized(SynthesizedAction),
}

/// Actions the server issues on behalf of the room.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SynthesizedAction {
    /// Restart the current item (loop replay).
    Seek {
        value: f64,
        is_replay: bool,
        room: String,
    },
    /// Load the next queued item.
    ChangeLink {
        value: String,
        source: MediaSource,
        room: String,
    },
}

/// Recipient set of an outbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Only the connection whose event produced this message.
    Private,
    /// Every member of the room, the originator included.
    Room(String),
}

/// An event together with its recipients.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub delivery: Delivery,
    pub event: ServerEvent,
}

impl Outbound {
    /// Addresses `event` to the originating connection only.
    pub fn private(event: ServerEvent) -> Self {
        Self {
            delivery: Delivery::Private,
            event,
        }
    }

    /// Addresses `event` to every member of `room`.
    pub fn room(room: &str, event: ServerEvent) -> Self {
        Self {
            delivery: Delivery::Room(room.to_string()),
            event,
        }
    }
}

impl ServerEvent {
    /// Builds a room notice.
    pub fn status(msg: impl Into<String>) -> Self {
        Self::Status(StatusPayload { msg: msg.into() })
    }

    /// Builds an error reply.
    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            code,
            message: message.into(),
        })
    }

    /// Returns the wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SyncState(_) => "sync_state",
            Self::Status(_) => "status",
            Self::SyncAction(_) => "sync_action",
            Self::QueueUpdate(_) => "queue_update",
            Self::Error(_) => "error",
            Self::HeartbeatAck => "heartbeat_ack",
        }
    }
}
