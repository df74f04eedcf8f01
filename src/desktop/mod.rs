//! Desktop bridge for native notification side effects.
//!
//! Everything in here is best-effort: the store calls the bridge after its
//! own state is committed, logs failures, and never propagates them.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::infrastructure::config::DesktopConfig;
use crate::notification::NotificationItem;

/// Error type for bridge operations
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Desktop bridge unavailable: {0}")]
    Unavailable(String),
}

/// Sink for native notification and badge side effects
#[async_trait]
pub trait DesktopBridge: Send + Sync {
    /// Show a native notification for a pushed item
    async fn notify(&self, item: &NotificationItem) -> Result<(), BridgeError>;

    /// Update the application badge with the current unread count
    async fn set_badge(&self, unread: u64) -> Result<(), BridgeError>;
}

/// Bridge that writes notifications to the log instead of the desktop
pub struct LogBridge;

#[async_trait]
impl DesktopBridge for LogBridge {
    async fn notify(&self, item: &NotificationItem) -> Result<(), BridgeError> {
        tracing::info!(
            token = %item.token,
            event = %item.event,
            title = %item.title,
            "Desktop notification"
        );
        Ok(())
    }

    async fn set_badge(&self, unread: u64) -> Result<(), BridgeError> {
        tracing::debug!(unread = unread, "Badge updated");
        Ok(())
    }
}

/// Bridge that drops all desktop side effects
pub struct NoopBridge;

#[async_trait]
impl DesktopBridge for NoopBridge {
    async fn notify(&self, _item: &NotificationItem) -> Result<(), BridgeError> {
        Ok(())
    }

    async fn set_badge(&self, _unread: u64) -> Result<(), BridgeError> {
        Ok(())
    }
}

/// Create a desktop bridge based on configuration.
///
/// Returns the appropriate bridge implementation based on the `backend` setting:
/// - `"none"`: Returns a `NoopBridge` that drops everything
/// - `"log"` (default): Returns a `LogBridge` that writes to the log
pub fn create_desktop_bridge(config: &DesktopConfig) -> Arc<dyn DesktopBridge> {
    match config.backend.as_str() {
        "none" => {
            tracing::info!(backend = "none", "Desktop bridge disabled");
            Arc::new(NoopBridge)
        }
        _ => {
            tracing::info!(backend = "log", "Creating log desktop bridge");
            Arc::new(LogBridge)
        }
    }
}
