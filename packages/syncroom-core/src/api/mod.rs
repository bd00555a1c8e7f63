//! HTTP/WebSocket API layer.
//!
//! This module contains thin handlers that delegate to the sync router.
//! It provides the router construction and server startup functionality.

use std::sync::Arc;

use thiserror::Error;

use crate::clock::Clock;
use crate::protocol_constants::{PORT_SCAN_END, PORT_SCAN_START};
use crate::room::RoomRegistry;
use crate::state::Config;
use crate::sync::SyncRouter;

pub mod http;
pub mod response;
pub mod ws;
pub mod ws_connection;

pub use ws_connection::{ConnectionGuard, WsConnectionManager};

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to a TCP port.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),

    /// No available ports in the specified range.
    #[error("No available ports in range {start}-{end}")]
    NoAvailablePort { start: u16, end: u16 },
}

/// Shared application state for the API layer.
///
/// This is a thin wrapper that holds references to services.
/// All business logic lives in the router and room modules.
#[derive(Clone)]
pub struct AppState {
    /// Live rooms.
    pub registry: Arc<RoomRegistry>,
    /// Applies client events and delivers broadcasts.
    pub router: Arc<SyncRouter>,
    /// Manages WebSocket connections and room membership.
    pub ws_manager: Arc<WsConnectionManager>,
    /// Time source shared with the router.
    pub clock: Arc<dyn Clock>,
    /// Application configuration.
    pub config: Arc<Config>,
}

/// Builder for constructing an `AppState`.
#[derive(Default)]
pub struct AppStateBuilder {
    registry: Option<Arc<RoomRegistry>>,
    router: Option<Arc<SyncRouter>>,
    ws_manager: Option<Arc<WsConnectionManager>>,
    clock: Option<Arc<dyn Clock>>,
    config: Option<Arc<Config>>,
}

impl AppStateBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the room registry.
    pub fn registry(mut self, registry: Arc<RoomRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the sync router.
    pub fn router(mut self, router: Arc<SyncRouter>) -> Self {
        self.router = Some(router);
        self
    }

    /// Sets the WebSocket connection manager.
    pub fn ws_manager(mut self, manager: Arc<WsConnectionManager>) -> Self {
        self.ws_manager = Some(manager);
        self
    }

    /// Sets the clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the configuration.
    pub fn config(mut self, config: Arc<Config>) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds the `AppState`, panicking if required fields are missing.
    pub fn build(self) -> AppState {
        AppState {
            registry: self.registry.expect("registry is required"),
            router: self.router.expect("router is required"),
            ws_manager: self.ws_manager.expect("ws_manager is required"),
            clock: self.clock.expect("clock is required"),
            config: self.config.expect("config is required"),
        }
    }
}

impl AppState {
    /// Creates a new builder for constructing an `AppState`.
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }
}

async fn find_available_port(
    start: u16,
    end: u16,
) -> Result<(u16, tokio::net::TcpListener), ServerError> {
    for port in start..=end {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => return Ok((port, listener)),
            Err(_) => continue,
        }
    }
    Err(ServerError::NoAvailablePort { start, end })
}

/// Starts the HTTP server on the configured or auto-discovered port.
///
/// Runs until the listener fails; the caller owns shutdown.
pub async fn start_server(state: AppState) -> Result<(), ServerError> {
    let preferred_port = state.config.preferred_port;
    let (port, listener) = if preferred_port > 0 {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], preferred_port));
        (preferred_port, tokio::net::TcpListener::bind(&addr).await?)
    } else {
        find_available_port(PORT_SCAN_START, PORT_SCAN_END).await?
    };

    log::info!("Server listening on http://0.0.0.0:{}", port);
    let app = http::create_router(state);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_START: u16 = 49400;
    const TEST_END: u16 = 49410;

    #[tokio::test]
    async fn find_available_port_skips_bound_ports() {
        let (first, _held) = find_available_port(TEST_START, TEST_END)
            .await
            .unwrap();
        let (second, _also_held) = find_available_port(first, TEST_END).await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn exhausted_range_is_an_error() {
        let (port, _held) = find_available_port(TEST_START, TEST_END)
            .await
            .unwrap();
        let err = find_available_port(port, port).await.unwrap_err();
        assert!(matches!(err, ServerError::NoAvailablePort { .. }));
    }
}
