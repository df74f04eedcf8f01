use anyhow::Result;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;

use ara_notification_client::client::NotificationClient;
use ara_notification_client::config::Settings;
use ara_notification_client::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Initialize tracing (with OTLP export when enabled)
    let _telemetry = init_telemetry(&settings.otel)?;
    tracing::info!("Configuration loaded");

    // Build the client
    let client = NotificationClient::new(settings)?;
    tracing::info!("Notification client initialized");

    // Seed local state from the list endpoint; pushes still flow if this fails
    match client.refresh().await {
        Ok(snapshot) => tracing::info!(
            notifications = snapshot.items.len(),
            unread = snapshot.extra.unread_count,
            "Notification list loaded"
        ),
        Err(e) => tracing::warn!(error = %e, "Initial refresh failed"),
    }

    // Start push delivery
    client.connect().await?;
    tracing::info!("Push delivery started");

    // Log incoming pushes until the client shuts down
    let mut pushes = client.subscribe_pushes();
    let store = client.store();
    let watcher_handle = tokio::spawn(async move {
        loop {
            match pushes.recv().await {
                Ok(item) => {
                    let unread = store.unread_count().await;
                    tracing::info!(
                        token = %item.token,
                        title = %item.title,
                        unread,
                        "Notification received"
                    );
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Push watcher lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Run until Ctrl+C or SIGTERM
    shutdown_signal().await;

    tracing::info!("Shutting down notification client...");
    let _ = client.disconnect().await;
    client.shutdown().await;
    let _ = watcher_handle.await;

    tracing::info!("Client shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
