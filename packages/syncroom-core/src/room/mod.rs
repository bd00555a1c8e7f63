//! Authoritative per-room playback state.
//!
//! - [`RoomState`]: the playback record for one room
//! - [`RoomRegistry`]: lazily-populated map of room id to state
//! - [`effective_position`]: extrapolates the stored anchor to "now"

pub mod extrapolate;
pub mod registry;
pub mod state;

pub use extrapolate::effective_position;
pub use registry::{RoomHandle, RoomRegistry, RoomSummary};
pub use state::{MediaSource, RoomSnapshot, RoomState};
