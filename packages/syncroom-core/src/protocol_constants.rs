//! Fixed protocol constants that should NOT be changed.
//!
//! These values are part of the wire contract with browser clients or
//! identify the service to monitoring tools. Tunable values live in
//! [`Config`](crate::state::Config) instead.

// ─────────────────────────────────────────────────────────────────────────────
// Service Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Service identifier reported by `/health`.
pub const SERVICE_ID: &str = "syncroom";

// ─────────────────────────────────────────────────────────────────────────────
// Port Allocation
// ─────────────────────────────────────────────────────────────────────────────

/// First port tried when no preferred port is configured.
pub const PORT_SCAN_START: u16 = 5000;

/// Last port tried when no preferred port is configured.
pub const PORT_SCAN_END: u16 = 5010;

// ─────────────────────────────────────────────────────────────────────────────
// WebSocket
// ─────────────────────────────────────────────────────────────────────────────

/// Interval between heartbeat timeout checks (seconds).
pub const WS_HEARTBEAT_CHECK_INTERVAL_SECS: u64 = 5;

/// Prefix for generated connection identifiers (`ws-1`, `ws-2`, ...).
pub const WS_CONNECTION_ID_PREFIX: &str = "ws-";

// ─────────────────────────────────────────────────────────────────────────────
// Room Protocol
// ─────────────────────────────────────────────────────────────────────────────

/// Suffix of the room-wide notice sent when a user joins.
pub const JOIN_NOTICE_SUFFIX: &str = " has entered the room.";

/// Suffix of the room-wide notice sent when a user leaves.
pub const LEAVE_NOTICE_SUFFIX: &str = " has left the room.";
