//! WebSocket connection tracking and room membership.
//!
//! This module provides tracking of WebSocket connections with force-close capability:
//!
//! - `WsConnectionManager`: Tracks active connections, their outbound queues,
//!   and which rooms they have joined; delivers room broadcasts
//! - `ConnectionGuard`: RAII guard for automatic cleanup on disconnect

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use crate::events::{Broadcaster, Delivery, Outbound};
use crate::protocol_constants::WS_CONNECTION_ID_PREFIX;

/// Serialized event text queued for one connection.
pub type OutboundText = Arc<str>;

/// Internal connection state.
struct ConnectionState {
    /// Queue drained by the connection's socket task.
    tx: mpsc::Sender<OutboundText>,
    /// Joined rooms: room id -> username used when joining.
    rooms: HashMap<String, String>,
}

/// Manages all active WebSocket connections and their room membership.
///
/// Thread-safe and designed for concurrent access from multiple
/// WebSocket handlers. Uses hierarchical cancellation tokens for
/// efficient force-close of all connections.
pub struct WsConnectionManager {
    /// Active connections: connection_id -> ConnectionState
    connections: DashMap<String, ConnectionState>,
    /// Membership index: room id -> connection ids
    members: DashMap<String, HashSet<String>>,
    /// Counter for generating unique connection IDs.
    next_id: AtomicU64,
    /// Capacity of each connection's outbound queue.
    outbound_buffer: usize,
    /// Global cancellation token - when cancelled, all connections close.
    /// Wrapped in RwLock so it can be replaced after close_all().
    global_cancel: RwLock<CancellationToken>,
}

impl WsConnectionManager {
    /// Creates a new connection manager with the given per-connection queue capacity.
    pub fn new(outbound_buffer: usize) -> Self {
        Self {
            connections: DashMap::new(),
            members: DashMap::new(),
            next_id: AtomicU64::new(1),
            outbound_buffer: outbound_buffer.max(1),
            global_cancel: RwLock::new(CancellationToken::new()),
        }
    }

    /// Registers a new connection and returns a guard for RAII cleanup
    /// together with the receiving end of its outbound queue.
    ///
    /// The returned `ConnectionGuard` will automatically unregister the
    /// connection (and remove it from every room) when dropped.
    pub fn register(self: &Arc<Self>) -> (ConnectionGuard, mpsc::Receiver<OutboundText>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let conn_id = format!("{}{}", WS_CONNECTION_ID_PREFIX, id);
        let cancel_token = self.global_cancel.read().child_token();
        let (tx, rx) = mpsc::channel(self.outbound_buffer);

        let state = ConnectionState {
            tx,
            rooms: HashMap::new(),
        };

        self.connections.insert(conn_id.clone(), state);
        log::info!(
            "[WS] Connection registered: {} (total: {})",
            conn_id,
            self.connections.len()
        );

        let guard = ConnectionGuard {
            id: conn_id,
            manager: Arc::clone(self),
            cancel_token,
        };
        (guard, rx)
    }

    /// Unregisters a connection by ID, removing it from all rooms.
    fn unregister(&self, id: &str) {
        if let Some((_, state)) = self.connections.remove(id) {
            for room in state.rooms.keys() {
                self.remove_member(room, id);
            }
            log::info!(
                "[WS] Connection unregistered: {} (remaining: {})",
                id,
                self.connections.len()
            );
        }
    }

    /// Adds a connection to a room under `username`.
    ///
    /// Returns `false` if the connection is not registered.
    pub fn join_room(&self, conn_id: &str, room: &str, username: &str) -> bool {
        match self.connections.get_mut(conn_id) {
            Some(mut conn) => {
                conn.rooms.insert(room.to_string(), username.to_string());
            }
            None => return false,
        }
        self.members
            .entry(room.to_string())
            .or_default()
            .insert(conn_id.to_string());
        log::debug!("[WS] {} joined room {}", conn_id, room);
        true
    }

    /// Removes a connection from a room.
    ///
    /// Returns the username the connection joined with, or `None` if it was
    /// not a member.
    pub fn leave_room(&self, conn_id: &str, room: &str) -> Option<String> {
        let username = self
            .connections
            .get_mut(conn_id)
            .and_then(|mut conn| conn.rooms.remove(room))?;
        self.remove_member(room, conn_id);
        log::debug!("[WS] {} left room {}", conn_id, room);
        Some(username)
    }

    fn remove_member(&self, room: &str, conn_id: &str) {
        if let Some(mut ids) = self.members.get_mut(room) {
            ids.remove(conn_id);
        }
        self.members.remove_if(room, |_, ids| ids.is_empty());
    }

    /// Returns the rooms a connection has joined, with the username used for each.
    pub fn rooms_of(&self, conn_id: &str) -> Vec<(String, String)> {
        self.connections
            .get(conn_id)
            .map(|conn| {
                conn.rooms
                    .iter()
                    .map(|(room, user)| (room.clone(), user.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the number of connections in a room.
    #[must_use]
    pub fn member_count(&self, room: &str) -> usize {
        self.members.get(room).map_or(0, |ids| ids.len())
    }

    /// Returns whether any connection is in the room.
    #[must_use]
    pub fn is_occupied(&self, room: &str) -> bool {
        self.member_count(room) > 0
    }

    /// Returns the number of active connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Queues serialized event text for one connection without blocking.
    ///
    /// A full queue drops the message for that connection only.
    pub fn send_to(&self, conn_id: &str, text: OutboundText) {
        let Some(conn) = self.connections.get(conn_id) else {
            return;
        };
        match conn.tx.try_send(text) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                log::warn!("[WS] Outbound queue full for {}, dropping event", conn_id);
            }
            Err(TrySendError::Closed(_)) => {
                log::debug!("[WS] Outbound queue closed for {}", conn_id);
            }
        }
    }

    /// Force-closes all connections.
    ///
    /// This cancels the global token, which signals all connection handlers
    /// to terminate gracefully. After cancellation, a fresh token is created
    /// so new connections can still be accepted.
    ///
    /// Returns the number of connections that were signaled to close.
    pub fn close_all(&self) -> usize {
        let count = self.connections.len();
        if count > 0 {
            log::info!("[WS] Force-closing {} connection(s)", count);
            // Cancel current token and replace with a fresh one
            let mut guard = self.global_cancel.write();
            guard.cancel();
            *guard = CancellationToken::new();
        } else {
            log::info!("[WS] close_all called but no connections to close");
        }
        count
    }
}

impl Broadcaster for WsConnectionManager {
    fn deliver(&self, origin: &str, outbound: &Outbound) {
        let text: OutboundText = match serde_json::to_string(&outbound.event) {
            Ok(json) => json.into(),
            Err(e) => {
                log::warn!("[WS] Failed to serialize {}: {}", outbound.event.name(), e);
                return;
            }
        };

        match &outbound.delivery {
            Delivery::Private => self.send_to(origin, text),
            Delivery::Room(room) => {
                let recipients: Vec<String> = self
                    .members
                    .get(room)
                    .map(|ids| ids.iter().cloned().collect())
                    .unwrap_or_default();
                for conn_id in recipients {
                    self.send_to(&conn_id, Arc::clone(&text));
                }
            }
        }
    }
}

/// RAII guard that unregisters a connection when dropped.
///
/// This ensures connections are always cleaned up, even if the handler
/// panics or exits early.
pub struct ConnectionGuard {
    id: String,
    manager: Arc<WsConnectionManager>,
    /// Token for this specific connection - cancelled on force-close.
    cancel_token: CancellationToken,
}

impl ConnectionGuard {
    /// Returns the connection ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the cancellation token for this connection.
    ///
    /// Use this in `tokio::select!` to detect force-close requests:
    /// ```ignore
    /// tokio::select! {
    ///     _ = cancel_token.cancelled() => break,
    ///     // ... other branches
    /// }
    /// ```
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.manager.unregister(&self.id);
    }
}
