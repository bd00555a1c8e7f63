//! Background removal of idle, unoccupied rooms.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::api::WsConnectionManager;
use crate::clock::Clock;
use crate::room::RoomRegistry;
use crate::runtime::TaskSpawner;
use crate::state::RoomConfig;

/// Periodically drops rooms nobody is connected to and nobody has touched
/// for `idle_room_ttl_secs`.
///
/// A room with at least one member is never reaped, however old its state.
pub struct RoomReaper {
    registry: Arc<RoomRegistry>,
    ws_manager: Arc<WsConnectionManager>,
    clock: Arc<dyn Clock>,
    ttl_ms: u64,
    interval: Duration,
    cancel_token: CancellationToken,
}

impl RoomReaper {
    /// Creates a reaper from the room configuration.
    pub fn new(
        registry: Arc<RoomRegistry>,
        ws_manager: Arc<WsConnectionManager>,
        clock: Arc<dyn Clock>,
        config: &RoomConfig,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            registry,
            ws_manager,
            clock,
            ttl_ms: config.idle_room_ttl_secs.saturating_mul(1000),
            interval: Duration::from_secs(config.reaper_interval_secs),
            cancel_token,
        }
    }

    /// Runs one sweep and returns the ids of removed rooms.
    pub fn sweep(&self) -> Vec<String> {
        let now = self.clock.now_millis();
        let removed = self
            .registry
            .remove_idle(now, self.ttl_ms, |room| self.ws_manager.is_occupied(room));
        if !removed.is_empty() {
            log::info!(
                "[Reaper] Removed {} idle room(s): {:?} (remaining: {})",
                removed.len(),
                removed,
                self.registry.len()
            );
        }
        removed
    }

    /// Starts the sweep loop; it stops when the cancellation token fires.
    pub fn start<S: TaskSpawner>(self: Arc<Self>, spawner: &S) {
        let cancel_token = self.cancel_token.clone();
        log::info!(
            "[Reaper] Started (ttl: {}s, interval: {}s)",
            self.ttl_ms / 1000,
            self.interval.as_secs()
        );
        spawner.spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        log::info!("[Reaper] Shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        self.sweep();
                    }
                }
            }
        });
    }
}
