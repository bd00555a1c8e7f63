//! Room synchronization state machine.
//!
//! - [`action`]: inbound client events and their parsing
//! - [`machine`]: pure transitions from (state, action, now) to outbound events
//! - [`router`]: resolves rooms, serializes per-room processing, delivers results

pub mod action;
pub mod machine;
pub mod router;

pub use action::{ClientEvent, JoinRequest, LeaveRequest, SyncAction, SyncActionRequest};
pub use router::SyncRouter;
