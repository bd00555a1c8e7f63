//! Broadcaster abstraction for decoupling the router from transport.
//!
//! The router depends on the [`Broadcaster`] trait rather than on concrete
//! WebSocket connections, enabling testing and alternative transports.

use super::{Delivery, Outbound};

/// Trait for delivering outbound events without knowledge of transport.
///
/// `origin` identifies the connection whose inbound event produced the
/// message; it is the recipient of [`Delivery::Private`] messages.
///
/// Implementations are called while the room's state lock is held and must
/// not block.
///
/// # Example
///
/// ```ignore
/// struct MyTransport { /* connections */ }
///
/// impl Broadcaster for MyTransport {
///     fn deliver(&self, origin: &str, outbound: &Outbound) {
///         // enqueue outbound.event for the right connections
///     }
/// }
/// ```
pub trait Broadcaster: Send + Sync {
    /// Delivers one outbound event.
    fn deliver(&self, origin: &str, outbound: &Outbound);
}

/// Logging broadcaster for debugging and development.
///
/// Logs all deliveries at debug level. Useful for tracing event flow
/// through rooms.
pub struct LoggingBroadcaster;

impl Broadcaster for LoggingBroadcaster {
    fn deliver(&self, origin: &str, outbound: &Outbound) {
        match &outbound.delivery {
            Delivery::Private => {
                tracing::debug!(origin, event = outbound.event.name(), "private_event");
            }
            Delivery::Room(room) => {
                tracing::debug!(origin, room = %room, event = ?outbound.event, "room_event");
            }
        }
    }
}
