//! Bridge that fans deliveries out to the transport and an optional observer.
//!
//! The [`BroadcastBridge`] sits between the router and the transport. The
//! primary broadcaster (normally the WebSocket connection manager) receives
//! every delivery; an observer can be attached after construction, e.g. to
//! trace room traffic.

use std::sync::Arc;

use parking_lot::RwLock;

use super::emitter::Broadcaster;
use super::Outbound;

/// Forwards deliveries to a primary broadcaster and an optional observer.
///
/// # Thread Safety
///
/// The bridge is `Send + Sync` and can be shared across async tasks.
/// The observer uses `RwLock` to allow setting it after construction.
#[derive(Clone)]
pub struct BroadcastBridge {
    primary: Arc<dyn Broadcaster>,
    observer: Arc<RwLock<Option<Arc<dyn Broadcaster>>>>,
}

impl BroadcastBridge {
    /// Creates a bridge delivering to `primary`.
    pub fn new(primary: Arc<dyn Broadcaster>) -> Self {
        Self {
            primary,
            observer: Arc::new(RwLock::new(None)),
        }
    }

    /// Sets an observer that sees every delivery after the primary.
    pub fn set_observer(&self, observer: Arc<dyn Broadcaster>) {
        *self.observer.write() = Some(observer);
    }
}

impl Broadcaster for BroadcastBridge {
    fn deliver(&self, origin: &str, outbound: &Outbound) {
        self.primary.deliver(origin, outbound);
        if let Some(ref observer) = *self.observer.read() {
            observer.deliver(origin, outbound);
        }
    }
}
