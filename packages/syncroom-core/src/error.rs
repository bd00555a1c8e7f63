//! Centralized error types for the SyncRoom core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps errors to machine-readable codes sent to WebSocket clients
//! - Maps errors to HTTP status codes and implements `IntoResponse`

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code for API responses.
    fn code(&self) -> &'static str;
}

/// Application-wide error type for room synchronization.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SyncError {
    /// Frame was not valid JSON or did not match any known event shape.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// `sync_action` carried a `type` the server does not know.
    #[error("Unknown action type: {0}")]
    UnknownAction(String),

    /// `sync_action` or `leave` did not name a room.
    #[error("Missing room identifier")]
    MissingRoom,

    /// Action targeted a room that was never joined.
    #[error("Room not found: {0}")]
    RoomNotFound(String),
}

impl ErrorCode for SyncError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidPayload(_) => "invalid_payload",
            Self::UnknownAction(_) => "unknown_action",
            Self::MissingRoom => "missing_room",
            Self::RoomNotFound(_) => "room_not_found",
        }
    }
}

impl SyncError {
    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RoomNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidPayload(_) | Self::UnknownAction(_) | Self::MissingRoom => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidPayload(err.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result Type Aliases
// ─────────────────────────────────────────────────────────────────────────────

/// Convenient Result alias for room synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    status: u16,
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}
