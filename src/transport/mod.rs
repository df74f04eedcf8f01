//! Push transports.
//!
//! Two transports deliver notification pushes: a Redis pub/sub subscription
//! (primary) and a long-lived HTTP notification stream (fallback). Both run
//! as owned tasks that report to the connection supervisor through a single
//! event channel and stop when the cancellation channel fires.

mod parser;
mod pubsub;
mod stream;

pub use parser::{EventStreamParser, NOTIFICATION_EVENT};
pub use pubsub::PubSubTransport;
pub use stream::StreamTransport;

use crate::notification::NotificationItem;

/// Which transport produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    PubSub,
    Stream,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::PubSub => "pubsub",
            TransportKind::Stream => "stream",
        }
    }
}

/// Why a transport task stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportClose {
    /// The server ended the connection cleanly
    ServerClosed,
    /// The connection failed or dropped mid-flight
    Failed(String),
    /// We shut the transport down deliberately
    Cancelled,
}

impl TransportClose {
    /// Deliberate closes never re-enter the reconnect path.
    pub fn should_reconnect(&self) -> bool {
        !matches!(self, TransportClose::Cancelled)
    }
}

/// Events a transport task sends to the connection supervisor
#[derive(Debug)]
pub enum TransportEvent {
    /// Pub/sub handshake completed and the subscription is live
    PubSubReady,
    /// Pub/sub handshake failed or timed out
    PubSubUnavailable { reason: String },
    /// A notification push arrived
    Notification(TransportKind, NotificationItem),
    /// The transport stopped
    Closed(TransportKind, TransportClose),
}
