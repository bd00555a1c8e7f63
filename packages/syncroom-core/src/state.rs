//! Core application configuration.
//!
//! [`Config`] holds every tunable value of the server. The standalone binary
//! builds it from a YAML file plus environment overrides; tests use
//! `Config::default()`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorCode;

/// Configuration values that would cause runtime failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `reaper_interval_secs` was zero (`tokio::time::interval` panics on 0).
    #[error("reaper_interval_secs must be >= 1")]
    ZeroReaperInterval,

    /// `ws_outbound_buffer` was zero (`mpsc::channel` panics on 0).
    #[error("ws_outbound_buffer must be >= 1")]
    ZeroOutboundBuffer,

    /// `ws_heartbeat_timeout_secs` was zero.
    #[error("ws_heartbeat_timeout_secs must be >= 1")]
    ZeroHeartbeatTimeout,
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::ZeroReaperInterval => "invalid_reaper_interval",
            Self::ZeroOutboundBuffer => "invalid_outbound_buffer",
            Self::ZeroHeartbeatTimeout => "invalid_heartbeat_timeout",
        }
    }
}

/// Configuration for room lifecycle and diagnostics.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RoomConfig {
    /// Rooms with no members and no activity for this long are removed
    /// (seconds). 0 keeps rooms for the lifetime of the process.
    pub idle_room_ttl_secs: u64,

    /// Interval between idle-room scans (seconds).
    pub reaper_interval_secs: u64,

    /// Reply with an `error` event when an action names a room that was
    /// never joined, instead of dropping it silently.
    pub report_unknown_room: bool,
}

impl RoomConfig {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reaper_interval_secs == 0 {
            return Err(ConfigError::ZeroReaperInterval);
        }
        Ok(())
    }

    /// Returns whether idle rooms should be reclaimed.
    pub fn reaper_enabled(&self) -> bool {
        self.idle_room_ttl_secs > 0
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            idle_room_ttl_secs: 0,
            reaper_interval_secs: 60,
            report_unknown_room: false,
        }
    }
}

/// Configuration for the SyncRoom server.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    // Server
    /// Preferred port for the HTTP/WS server (0 = first free port in 5000-5010).
    pub preferred_port: u16,

    // Rooms
    /// Room lifecycle configuration.
    pub rooms: RoomConfig,

    // WebSocket
    /// Close connections silent for this long (seconds).
    pub ws_heartbeat_timeout_secs: u64,

    /// Outbound events queued per connection before new ones are dropped.
    pub ws_outbound_buffer: usize,

    // Diagnostics
    /// Log every delivered event at debug level.
    pub trace_broadcasts: bool,
}

impl Config {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns the first value that would cause a runtime failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rooms.validate()?;
        if self.ws_outbound_buffer == 0 {
            return Err(ConfigError::ZeroOutboundBuffer);
        }
        if self.ws_heartbeat_timeout_secs == 0 {
            return Err(ConfigError::ZeroHeartbeatTimeout);
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preferred_port: 0,
            rooms: RoomConfig::default(),
            ws_heartbeat_timeout_secs: 60,
            ws_outbound_buffer: 256,
            trace_broadcasts: false,
        }
    }
}
