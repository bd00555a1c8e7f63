//! Background services.

pub mod room_reaper;

pub use room_reaper::RoomReaper;
