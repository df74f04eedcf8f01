//! Redis pub/sub transport (primary push path).

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{broadcast, mpsc};

use crate::infrastructure::config::PubSubConfig;
use crate::infrastructure::metrics::TransportMetrics;
use crate::notification::NotificationItem;
use crate::transport::{TransportClose, TransportEvent, TransportKind};

/// Subscriber for the notification pub/sub channels
pub struct PubSubTransport {
    config: PubSubConfig,
}

impl PubSubTransport {
    pub fn new(config: PubSubConfig) -> Self {
        Self { config }
    }

    /// Whether pub/sub is usable at all. With no channels configured the
    /// transport selector goes straight to the stream fallback.
    pub fn is_configured(&self) -> bool {
        !self.config.channels.is_empty()
    }

    /// Attempt the subscription handshake, then pump messages until the
    /// connection drops or the cancellation channel fires.
    ///
    /// The handshake outcome is reported as `PubSubReady` or
    /// `PubSubUnavailable`; only a ready transport ever emits `Closed`.
    pub async fn run(
        &self,
        events: mpsc::Sender<TransportEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let handshake = Duration::from_secs(self.config.handshake_timeout_seconds);

        let mut pubsub = match tokio::time::timeout(handshake, self.connect()).await {
            Ok(Ok(pubsub)) => pubsub,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Pub/sub handshake failed");
                let _ = events
                    .send(TransportEvent::PubSubUnavailable {
                        reason: e.to_string(),
                    })
                    .await;
                return;
            }
            Err(_) => {
                tracing::warn!(
                    timeout_seconds = self.config.handshake_timeout_seconds,
                    "Pub/sub handshake timed out"
                );
                let _ = events
                    .send(TransportEvent::PubSubUnavailable {
                        reason: format!(
                            "handshake timed out after {}s",
                            self.config.handshake_timeout_seconds
                        ),
                    })
                    .await;
                return;
            }
        };

        tracing::info!("Redis subscription established");
        if events.send(TransportEvent::PubSubReady).await.is_err() {
            return;
        }

        let mut message_stream = pubsub.on_message();

        let close = loop {
            tokio::select! {
                // Handle shutdown signal
                _ = shutdown.recv() => {
                    tracing::info!("Received shutdown signal");
                    break TransportClose::Cancelled;
                }
                // Handle incoming messages
                msg = message_stream.next() => {
                    match msg {
                        Some(msg) => {
                            let channel: String = msg.get_channel_name().to_string();
                            let payload: String = match msg.get_payload() {
                                Ok(p) => p,
                                Err(e) => {
                                    tracing::warn!(error = %e, "Failed to get message payload");
                                    continue;
                                }
                            };

                            let Some(item) = parse_payload(&channel, &payload) else {
                                continue;
                            };
                            TransportMetrics::record_pubsub_push();
                            if events
                                .send(TransportEvent::Notification(TransportKind::PubSub, item))
                                .await
                                .is_err()
                            {
                                break TransportClose::Cancelled;
                            }
                        }
                        None => {
                            tracing::warn!("Redis message stream ended");
                            break TransportClose::Failed("message stream ended".to_string());
                        }
                    }
                }
            }
        };

        let _ = events
            .send(TransportEvent::Closed(TransportKind::PubSub, close))
            .await;
    }

    /// Connect and subscribe to the configured channels (with pattern support).
    async fn connect(&self) -> Result<redis::aio::PubSub, redis::RedisError> {
        let client = redis::Client::open(self.config.url.as_str())?;
        let mut pubsub = client.get_async_pubsub().await?;

        for channel in &self.config.channels {
            if channel.contains('*') || channel.contains('?') || channel.contains('[') {
                pubsub.psubscribe(channel).await?;
                tracing::debug!(pattern = %channel, "Subscribed to pattern");
            } else {
                pubsub.subscribe(channel).await?;
                tracing::debug!(channel = %channel, "Subscribed to channel");
            }
        }

        Ok(pubsub)
    }
}

/// Parse a pub/sub payload into a notification, logging and dropping
/// anything malformed.
fn parse_payload(channel: &str, payload: &str) -> Option<NotificationItem> {
    tracing::debug!(channel = %channel, "Received pub/sub message");

    match serde_json::from_str::<NotificationItem>(payload) {
        Ok(item) => Some(item),
        Err(e) => {
            TransportMetrics::record_parse_failure("pubsub");
            tracing::warn!(
                error = %e,
                channel = %channel,
                "Failed to parse pub/sub payload"
            );
            None
        }
    }
}
