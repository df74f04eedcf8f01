//! HTTP notification stream transport (fallback when pub/sub is unavailable).

use futures::StreamExt;
use reqwest::header::ACCEPT;
use tokio::sync::{broadcast, mpsc};

use crate::infrastructure::error::Result;
use crate::infrastructure::metrics::TransportMetrics;
use crate::transport::{EventStreamParser, TransportClose, TransportEvent, TransportKind};

/// Long-lived reader for the `notifications/stream/` endpoint
pub struct StreamTransport {
    http: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl StreamTransport {
    /// Build a stream transport for the given endpoint.
    ///
    /// The underlying client carries no request timeout, the stream is
    /// expected to stay open indefinitely.
    pub fn new(url: String, token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http, url, token })
    }

    /// Open the stream and pump notifications until it closes.
    ///
    /// Every exit path reports a `Closed` event with its cause; only a
    /// fired cancellation channel produces `Cancelled`.
    pub async fn run(
        &self,
        events: mpsc::Sender<TransportEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let close = self.pump(&events, &mut shutdown).await;
        let _ = events
            .send(TransportEvent::Closed(TransportKind::Stream, close))
            .await;
    }

    async fn pump(
        &self,
        events: &mpsc::Sender<TransportEvent>,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> TransportClose {
        tracing::info!(url = %self.url, "Opening notification stream");

        let mut request = self.http.get(&self.url).header(ACCEPT, "text/event-stream");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Received shutdown signal");
                return TransportClose::Cancelled;
            }
            result = request.send() => match result {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to open notification stream");
                    return TransportClose::Failed(e.to_string());
                }
            }
        };

        let response = match response.error_for_status() {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Notification stream rejected");
                return TransportClose::Failed(e.to_string());
            }
        };

        tracing::info!("Notification stream established");

        let mut stream = response.bytes_stream();
        let mut parser = EventStreamParser::new();

        loop {
            tokio::select! {
                // Handle shutdown signal
                _ = shutdown.recv() => {
                    tracing::info!("Received shutdown signal");
                    return TransportClose::Cancelled;
                }
                // Handle incoming chunks
                chunk = stream.next() => {
                    match chunk {
                        Some(Ok(chunk)) => {
                            TransportMetrics::record_stream_bytes(chunk.len() as u64);
                            for item in parser.push(&chunk) {
                                TransportMetrics::record_stream_push();
                                tracing::debug!(token = %item.token, "Received stream notification");
                                if events
                                    .send(TransportEvent::Notification(TransportKind::Stream, item))
                                    .await
                                    .is_err()
                                {
                                    return TransportClose::Cancelled;
                                }
                            }
                        }
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "Notification stream failed");
                            return TransportClose::Failed(e.to_string());
                        }
                        None => {
                            tracing::info!("Notification stream ended");
                            return TransportClose::ServerClosed;
                        }
                    }
                }
            }
        }
    }
}
