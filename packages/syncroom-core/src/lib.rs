//! Syncroom Core - shared playback rooms over WebSocket.
//!
//! Clients join named rooms and exchange playback intents (play, pause,
//! seek, loop, link changes, a shared queue). The server keeps one
//! authoritative state per room, extrapolates the playhead for late
//! joiners, and rebroadcasts every change to all members in order.
//!
//! # Architecture
//!
//! - [`room`]: Room state, playhead extrapolation and the room registry
//! - [`sync`]: Inbound client events, the per-room state machine and the router
//! - [`events`]: Outbound events and the [`Broadcaster`](events::Broadcaster) seam
//! - [`api`]: HTTP views, the WebSocket transport and server startup
//! - [`services`]: Background services (idle room reaper)
//! - [`bootstrap`]: Composition root
//! - [`state`]: Configuration
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`Broadcaster`](events::Broadcaster): Delivering outbound events
//! - [`Clock`](clock::Clock): Wall-clock time for playhead math
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks

#![warn(clippy::all)]

pub mod api;
pub mod bootstrap;
pub mod clock;
pub mod error;
pub mod events;
pub mod protocol_constants;
pub mod room;
pub mod runtime;
pub mod services;
pub mod state;
pub mod sync;
pub mod utils;

// Re-export commonly used types at the crate root
pub use api::{start_server, AppState, ServerError, WsConnectionManager};
pub use bootstrap::{bootstrap_services, bootstrap_with_clock, BootstrappedServices};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ErrorCode, SyncError, SyncResult};
pub use events::{BroadcastBridge, Broadcaster, Outbound, ServerEvent};
pub use room::{effective_position, MediaSource, RoomRegistry, RoomSnapshot, RoomState};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use state::{Config, ConfigError, RoomConfig};
pub use sync::{ClientEvent, SyncAction, SyncActionRequest, SyncRouter};
