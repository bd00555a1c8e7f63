//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to bind the HTTP server to (0 = first free port in 5000-5010).
    /// Override: `SYNCROOM_BIND_PORT`, falling back to `PORT`
    pub bind_port: u16,

    /// Seconds an empty room may sit untouched before it is dropped (0 = never).
    /// Override: `SYNCROOM_IDLE_ROOM_TTL`
    pub idle_room_ttl_secs: u64,

    /// Seconds between idle room sweeps.
    pub reaper_interval_secs: u64,

    /// Reply with an `error` event to actions for rooms that do not exist.
    /// Override: `SYNCROOM_REPORT_UNKNOWN_ROOM`
    pub report_unknown_room: bool,

    /// Close WebSocket connections silent for this many seconds.
    pub heartbeat_timeout_secs: u64,

    /// Events queued per connection before new ones are dropped.
    pub outbound_buffer: usize,

    /// Log every delivered event at debug level.
    pub trace_broadcasts: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let core = syncroom_core::Config::default();
        Self {
            bind_port: 5000,
            idle_room_ttl_secs: core.rooms.idle_room_ttl_secs,
            reaper_interval_secs: core.rooms.reaper_interval_secs,
            report_unknown_room: core.rooms.report_unknown_room,
            heartbeat_timeout_secs: core.ws_heartbeat_timeout_secs,
            outbound_buffer: core.ws_outbound_buffer,
            trace_broadcasts: core.trace_broadcasts,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Applies environment variable overrides to the configuration.
    ///
    /// Unparseable values are ignored.
    fn apply_env_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Hosting platforms commonly inject PORT; the explicit variable wins.
        for key in ["PORT", "SYNCROOM_BIND_PORT"] {
            if let Some(port) = var(key).and_then(|v| v.parse().ok()) {
                self.bind_port = port;
            }
        }

        if let Some(ttl) = var("SYNCROOM_IDLE_ROOM_TTL").and_then(|v| v.parse().ok()) {
            self.idle_room_ttl_secs = ttl;
        }

        if let Some(report) = var("SYNCROOM_REPORT_UNKNOWN_ROOM").and_then(|v| parse_bool(&v)) {
            self.report_unknown_room = report;
        }
    }

    /// Converts to syncroom-core's Config type.
    pub fn to_core_config(&self) -> syncroom_core::Config {
        syncroom_core::Config {
            preferred_port: self.bind_port,
            rooms: syncroom_core::RoomConfig {
                idle_room_ttl_secs: self.idle_room_ttl_secs,
                reaper_interval_secs: self.reaper_interval_secs,
                report_unknown_room: self.report_unknown_room,
            },
            ws_heartbeat_timeout_secs: self.heartbeat_timeout_secs,
            ws_outbound_buffer: self.outbound_buffer,
            trace_broadcasts: self.trace_broadcasts,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
