//! Connection lifecycle state machine.
//!
//! Pure transition logic with no I/O. The supervisor feeds events in and
//! executes the returned actions, which keeps every transition testable
//! without a broker or an HTTP server behind it.

use std::time::Duration;

/// Connection lifecycle phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// No delivery active
    Idle,
    /// Probing the primary transport
    SelectingTransport,
    /// Receiving pushes over pub/sub
    ConnectedPubSub,
    /// Receiving pushes over the stream fallback
    ConnectedStream,
    /// Waiting out the retry delay
    ReconnectPending,
}

impl ConnectionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionPhase::Idle => "idle",
            ConnectionPhase::SelectingTransport => "selecting_transport",
            ConnectionPhase::ConnectedPubSub => "connected_pubsub",
            ConnectionPhase::ConnectedStream => "connected_stream",
            ConnectionPhase::ReconnectPending => "reconnect_pending",
        }
    }

    /// Value for the connection phase gauge
    pub fn gauge_value(&self) -> i64 {
        match self {
            ConnectionPhase::Idle => 0,
            ConnectionPhase::SelectingTransport => 1,
            ConnectionPhase::ConnectedPubSub => 2,
            ConnectionPhase::ConnectedStream => 3,
            ConnectionPhase::ReconnectPending => 4,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            ConnectionPhase::ConnectedPubSub | ConnectionPhase::ConnectedStream
        )
    }
}

/// Events fed into the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineEvent {
    /// Delivery requested
    Activate,
    /// Pub/sub handshake succeeded
    PubSubConnected,
    /// Pub/sub handshake failed, timed out, or is not configured
    PubSubUnavailable,
    /// Governor granted a reconnect slot
    RetryAllowed(Duration),
    /// Governor denied the reconnect
    RetryDenied,
    /// Retry delay elapsed
    RetryTimerFired,
    /// Delivery stopped by the owner
    Deactivate,
}

/// Work the supervisor must perform after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineAction {
    /// Begin the pub/sub handshake
    AttemptPubSub,
    /// Open the stream fallback
    OpenStream,
    /// Arm the retry timer
    ScheduleRetry(Duration),
    /// Tear down any live transport
    DisconnectAll,
}

/// Transition table for the connection lifecycle
pub struct ConnectionMachine {
    phase: ConnectionPhase,
}

impl ConnectionMachine {
    pub fn new() -> Self {
        Self {
            phase: ConnectionPhase::Idle,
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// Apply one event, returning the action the supervisor must run.
    ///
    /// Events that make no sense in the current phase are stale leftovers
    /// from a connection already torn down; they change nothing.
    pub fn handle(&mut self, event: MachineEvent) -> Option<MachineAction> {
        use ConnectionPhase::*;
        use MachineEvent::*;

        let (next, action) = match (self.phase, event) {
            (Idle, Activate) => (SelectingTransport, Some(MachineAction::AttemptPubSub)),
            (SelectingTransport, PubSubConnected) => (ConnectedPubSub, None),
            (SelectingTransport, PubSubUnavailable) => {
                (ConnectedStream, Some(MachineAction::OpenStream))
            }
            (ConnectedPubSub | ConnectedStream, RetryAllowed(delay)) => {
                (ReconnectPending, Some(MachineAction::ScheduleRetry(delay)))
            }
            (ConnectedPubSub | ConnectedStream, RetryDenied) => (Idle, None),
            (ReconnectPending, RetryTimerFired) => {
                (SelectingTransport, Some(MachineAction::AttemptPubSub))
            }
            (Idle, Deactivate) => return None,
            (_, Deactivate) => (Idle, Some(MachineAction::DisconnectAll)),
            _ => {
                tracing::debug!(
                    phase = self.phase.as_str(),
                    event = ?event,
                    "Ignoring stale connection event"
                );
                return None;
            }
        };

        if next != self.phase {
            tracing::info!(
                from = self.phase.as_str(),
                to = next.as_str(),
                "Connection phase changed"
            );
            self.phase = next;
        }

        action
    }
}

impl Default for ConnectionMachine {
    fn default() -> Self {
        Self::new()
    }
}
