//! General utilities shared across the application.

use std::time::{SystemTime, UNIX_EPOCH};

// ─────────────────────────────────────────────────────────────────────────────
// Time Utilities
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the current Unix timestamp in milliseconds.
///
/// Returns 0 if the system clock is before the Unix epoch (shouldn't happen in practice).
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Converts a millisecond interval to fractional seconds.
#[must_use]
pub fn millis_to_secs(millis: u64) -> f64 {
    millis as f64 / 1000.0
}

// ─────────────────────────────────────────────────────────────────────────────
// Playback Positions
// ─────────────────────────────────────────────────────────────────────────────

/// Clamps a client-supplied playback offset to a storable value.
///
/// Negative offsets become 0, as does NaN. Infinite offsets are rejected the
/// same way since no media item has an infinite duration.
#[must_use]
pub fn sanitize_position(secs: f64) -> f64 {
    if secs.is_finite() {
        secs.max(0.0)
    } else {
        0.0
    }
}
