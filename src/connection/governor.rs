//! Reconnect attempt budget over a rolling window.

use std::time::{Duration, Instant};

use crate::infrastructure::config::ReconnectConfig;
use crate::infrastructure::metrics::ReconnectMetrics;

/// Outcome of asking the governor for a reconnect slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Reconnect granted, wait out the delay first
    Allowed { delay: Duration },
    /// Attempt budget exhausted for the current window
    Denied,
}

/// Grants at most `max_attempts` reconnects per trailing window.
///
/// Timestamps older than the window are pruned before each decision, so the
/// budget recovers purely by time. A denial records nothing: it neither
/// consumes a slot nor extends the window.
pub struct ReconnectGovernor {
    config: ReconnectConfig,
    attempts: Vec<Instant>,
}

impl ReconnectGovernor {
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            attempts: Vec::new(),
        }
    }

    /// Request a reconnect slot at `now`.
    pub fn decide(&mut self, now: Instant) -> ReconnectDecision {
        let window = Duration::from_secs(self.config.window_seconds);
        self.attempts.retain(|t| now.duration_since(*t) < window);

        if self.attempts.len() >= self.config.max_attempts {
            ReconnectMetrics::record_denied();
            tracing::warn!(
                attempts = self.attempts.len(),
                window_seconds = self.config.window_seconds,
                "Reconnect denied, attempt budget exhausted"
            );
            return ReconnectDecision::Denied;
        }

        self.attempts.push(now);
        ReconnectMetrics::record_allowed();
        tracing::debug!(
            attempts = self.attempts.len(),
            max_attempts = self.config.max_attempts,
            "Reconnect allowed"
        );

        ReconnectDecision::Allowed {
            delay: Duration::from_secs(self.config.retry_delay_seconds),
        }
    }

    /// Attempts currently inside the window
    pub fn recent_attempts(&self) -> usize {
        self.attempts.len()
    }
}
