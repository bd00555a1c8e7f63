//! Application bootstrap and dependency wiring.
//!
//! This module contains the composition root - the single place where the
//! registry, transport, router and background services are instantiated and
//! wired together.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::api::{AppState, WsConnectionManager};
use crate::clock::{Clock, SystemClock};
use crate::events::{BroadcastBridge, Broadcaster, LoggingBroadcaster};
use crate::room::RoomRegistry;
use crate::runtime::TokioSpawner;
use crate::services::RoomReaper;
use crate::state::{Config, ConfigError};
use crate::sync::SyncRouter;

/// Container for all bootstrapped services.
///
/// This struct holds all the wired services created during bootstrap.
/// It's consumed by `AppState` to build the final application state.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// Live rooms.
    pub registry: Arc<RoomRegistry>,
    /// Manages WebSocket connections and room membership.
    pub ws_manager: Arc<WsConnectionManager>,
    /// Fans router deliveries out to the transport and an optional observer.
    pub bridge: Arc<BroadcastBridge>,
    /// Applies client events to rooms.
    pub router: Arc<SyncRouter>,
    /// Time source shared by router, reaper and HTTP views.
    pub clock: Arc<dyn Clock>,
    /// Validated configuration.
    pub config: Arc<Config>,
    /// Task spawner for background operations.
    pub spawner: TokioSpawner,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
}

impl BootstrappedServices {
    /// Builds the API state over these services.
    pub fn app_state(&self) -> AppState {
        AppState::builder()
            .registry(Arc::clone(&self.registry))
            .router(Arc::clone(&self.router))
            .ws_manager(Arc::clone(&self.ws_manager))
            .clock(Arc::clone(&self.clock))
            .config(Arc::clone(&self.config))
            .build()
    }

    /// Starts background services enabled by the configuration.
    pub fn start_background_tasks(&self) {
        if !self.config.rooms.reaper_enabled() {
            log::info!("[Bootstrap] Idle room reaper disabled");
            return;
        }
        let reaper = Arc::new(RoomReaper::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.ws_manager),
            Arc::clone(&self.clock),
            &self.config.rooms,
            self.cancel_token.child_token(),
        ));
        reaper.start(&self.spawner);
    }

    /// Initiates graceful shutdown of all services.
    pub fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");

        // Signal cancellation to all background tasks
        self.cancel_token.cancel();

        let connections_closed = self.ws_manager.close_all();
        log::info!(
            "[Bootstrap] Closed {} WebSocket connection(s), {} room(s) discarded",
            connections_closed,
            self.registry.len()
        );
        log::debug!("[Bootstrap] Rooms at shutdown: {:?}", self.registry.room_ids());

        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Bootstraps all services with the system clock.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
pub fn bootstrap_services(config: &Config) -> Result<BootstrappedServices, ConfigError> {
    bootstrap_with_clock(config, SystemClock::arc())
}

/// Bootstraps all services with an explicit clock.
///
/// Services are created in dependency order:
///
/// 1. Registry and connection manager (no dependencies)
/// 2. Broadcast bridge (delivers to the connection manager)
/// 3. Router (depends on registry, bridge, clock)
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
pub fn bootstrap_with_clock(
    config: &Config,
    clock: Arc<dyn Clock>,
) -> Result<BootstrappedServices, ConfigError> {
    config.validate()?;

    let spawner = TokioSpawner::current();
    let cancel_token = CancellationToken::new();

    let registry = Arc::new(RoomRegistry::new());
    let ws_manager = Arc::new(WsConnectionManager::new(config.ws_outbound_buffer));

    let bridge = Arc::new(BroadcastBridge::new(
        Arc::clone(&ws_manager) as Arc<dyn Broadcaster>
    ));
    if config.trace_broadcasts {
        bridge.set_observer(Arc::new(LoggingBroadcaster));
    }

    let router = Arc::new(SyncRouter::new(
        Arc::clone(&registry),
        Arc::clone(&bridge) as Arc<dyn Broadcaster>,
        Arc::clone(&clock),
        config.rooms.report_unknown_room,
    ));

    Ok(BootstrappedServices {
        registry,
        ws_manager,
        bridge,
        router,
        clock,
        config: Arc::new(config.clone()),
        spawner,
        cancel_token,
    })
}
