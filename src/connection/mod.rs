//! Connection supervision.
//!
//! A single supervisor task owns the connection machine, the reconnect
//! governor, and the live transport tasks. Transports report through a
//! per-session event channel; replacing the channel on each selection
//! round means events from a torn-down connection can never reach the
//! machine, so the latest connection always wins.

mod governor;
mod machine;

pub use governor::{ReconnectDecision, ReconnectGovernor};
pub use machine::{ConnectionMachine, ConnectionPhase, MachineAction, MachineEvent};

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::infrastructure::config::Settings;
use crate::infrastructure::error::{ClientError, Result};
use crate::infrastructure::metrics::{ReconnectMetrics, TransportMetrics};
use crate::notification::{NotificationItem, NotificationStore};
use crate::transport::{PubSubTransport, StreamTransport, TransportEvent};

#[derive(Debug)]
enum Command {
    Activate,
    Deactivate,
    Shutdown,
}

/// Handle to the supervisor task
pub struct ConnectionSupervisor {
    commands: mpsc::Sender<Command>,
    phase_rx: watch::Receiver<ConnectionPhase>,
    task: JoinHandle<()>,
}

impl ConnectionSupervisor {
    /// Spawn the supervisor task. Delivery stays idle until `activate`.
    pub fn spawn(
        settings: &Settings,
        store: Arc<NotificationStore>,
        pushes: broadcast::Sender<NotificationItem>,
    ) -> Result<Self> {
        let stream = Arc::new(StreamTransport::new(
            settings.stream_url(),
            settings.api.token.clone(),
        )?);
        let pubsub = Arc::new(PubSubTransport::new(settings.pubsub.clone()));

        let (phase_tx, phase_rx) = watch::channel(ConnectionPhase::Idle);
        let (command_tx, command_rx) = mpsc::channel(16);
        let (transport_tx, transport_rx) = mpsc::channel(64);

        let worker = Worker {
            machine: ConnectionMachine::new(),
            governor: ReconnectGovernor::new(settings.reconnect.clone()),
            store,
            pushes,
            phase_tx,
            pubsub,
            stream,
            cancel_tx: broadcast::channel(1).0,
            transport_tx,
            transport_rx,
        };
        let task = tokio::spawn(worker.run(command_rx));

        Ok(Self {
            commands: command_tx,
            phase_rx,
            task,
        })
    }

    /// Request push delivery. No-op if delivery is already active.
    pub async fn activate(&self) -> Result<()> {
        self.send(Command::Activate).await
    }

    /// Stop push delivery, tearing down any live transport.
    pub async fn deactivate(&self) -> Result<()> {
        self.send(Command::Deactivate).await
    }

    pub fn phase(&self) -> ConnectionPhase {
        *self.phase_rx.borrow()
    }

    /// Watch channel that tracks every phase change
    pub fn watch_phase(&self) -> watch::Receiver<ConnectionPhase> {
        self.phase_rx.clone()
    }

    /// Stop delivery and wait for the supervisor task to finish.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown).await;
        let _ = self.task.await;
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ClientError::Internal("connection supervisor stopped".to_string()))
    }
}

/// State owned by the supervisor task
struct Worker {
    machine: ConnectionMachine,
    governor: ReconnectGovernor,
    store: Arc<NotificationStore>,
    pushes: broadcast::Sender<NotificationItem>,
    phase_tx: watch::Sender<ConnectionPhase>,
    pubsub: Arc<PubSubTransport>,
    stream: Arc<StreamTransport>,
    /// Cancellation channel for the current session's transports
    cancel_tx: broadcast::Sender<()>,
    /// Kept so the event channel never closes mid-session
    transport_tx: mpsc::Sender<TransportEvent>,
    transport_rx: mpsc::Receiver<TransportEvent>,
}

impl Worker {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let retry_timer = tokio::time::sleep(Duration::ZERO);
        tokio::pin!(retry_timer);
        let mut retry_armed = false;

        loop {
            let action = tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(Command::Activate) => self.dispatch(MachineEvent::Activate),
                    Some(Command::Deactivate) => {
                        retry_armed = false;
                        self.dispatch(MachineEvent::Deactivate)
                    }
                    Some(Command::Shutdown) | None => {
                        self.dispatch(MachineEvent::Deactivate);
                        break;
                    }
                },
                Some(event) = self.transport_rx.recv() => {
                    self.handle_transport_event(event).await
                }
                () = &mut retry_timer, if retry_armed => {
                    retry_armed = false;
                    self.dispatch(MachineEvent::RetryTimerFired)
                }
            };

            if let Some(MachineAction::ScheduleRetry(delay)) = action {
                retry_timer
                    .as_mut()
                    .reset(tokio::time::Instant::now() + delay);
                retry_armed = true;
                tracing::info!(delay_seconds = delay.as_secs(), "Reconnect scheduled");
            }
        }

        tracing::info!("Connection supervisor stopped");
    }

    /// Feed the machine one event and execute the resulting action.
    fn dispatch(&mut self, event: MachineEvent) -> Option<MachineAction> {
        let action = self.machine.handle(event);
        self.publish_phase();

        match action {
            Some(MachineAction::AttemptPubSub) => self.begin_selection(),
            Some(MachineAction::OpenStream) => self.open_stream(),
            Some(MachineAction::DisconnectAll) => self.disconnect_all(),
            Some(MachineAction::ScheduleRetry(_)) | None => {}
        }

        action
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) -> Option<MachineAction> {
        match event {
            TransportEvent::PubSubReady => self.dispatch(MachineEvent::PubSubConnected),
            TransportEvent::PubSubUnavailable { reason } => {
                tracing::info!(reason = %reason, "Falling back to notification stream");
                ReconnectMetrics::record_fallback();
                self.dispatch(MachineEvent::PubSubUnavailable)
            }
            TransportEvent::Notification(kind, item) => {
                tracing::debug!(
                    transport = kind.as_str(),
                    token = %item.token,
                    "Notification push received"
                );
                self.store.apply_push(item.clone()).await;
                let _ = self.pushes.send(item);
                None
            }
            TransportEvent::Closed(kind, close) => {
                if !close.should_reconnect() || !self.machine.phase().is_connected() {
                    tracing::debug!(
                        transport = kind.as_str(),
                        cause = ?close,
                        "Transport close needs no reconnect"
                    );
                    return None;
                }

                tracing::warn!(
                    transport = kind.as_str(),
                    cause = ?close,
                    "Transport closed, consulting reconnect budget"
                );
                match self.governor.decide(Instant::now()) {
                    ReconnectDecision::Allowed { delay } => {
                        self.dispatch(MachineEvent::RetryAllowed(delay))
                    }
                    ReconnectDecision::Denied => self.dispatch(MachineEvent::RetryDenied),
                }
            }
        }
    }

    /// Open a fresh session: new cancel and event channels, then probe
    /// pub/sub. Without configured channels the probe is skipped and the
    /// fallback decision flows through the normal event path.
    fn begin_selection(&mut self) {
        let (cancel_tx, _) = broadcast::channel(1);
        let (tx, rx) = mpsc::channel(64);
        self.cancel_tx = cancel_tx;
        self.transport_tx = tx.clone();
        self.transport_rx = rx;

        if !self.pubsub.is_configured() {
            let _ = tx.try_send(TransportEvent::PubSubUnavailable {
                reason: "no pub/sub channels configured".to_string(),
            });
            return;
        }

        let pubsub = self.pubsub.clone();
        let cancel = self.cancel_tx.subscribe();
        tokio::spawn(async move {
            pubsub.run(tx, cancel).await;
        });
    }

    fn open_stream(&mut self) {
        let stream = self.stream.clone();
        let tx = self.transport_tx.clone();
        let cancel = self.cancel_tx.subscribe();
        tokio::spawn(async move {
            stream.run(tx, cancel).await;
        });
    }

    fn disconnect_all(&mut self) {
        // May have no live receivers when nothing is connected
        let _ = self.cancel_tx.send(());
    }

    fn publish_phase(&self) {
        let phase = self.machine.phase();
        TransportMetrics::set_phase(phase.gauge_value());
        self.phase_tx.send_if_modified(|current| {
            if *current != phase {
                *current = phase;
                true
            } else {
                false
            }
        });
    }
}
