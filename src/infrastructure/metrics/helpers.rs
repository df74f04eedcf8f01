//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    CONNECTION_PHASE, DESKTOP_FAILURES_TOTAL, DESKTOP_NOTIFICATIONS_TOTAL,
    FALLBACK_ACTIVATIONS_TOTAL, MARKED_READ_TOTAL, NOTIFICATIONS_TOTAL, PAGES_MERGED_TOTAL,
    PUSHES_RECEIVED_TOTAL, PUSH_PARSE_FAILURES_TOTAL, RECONNECTS_ALLOWED_TOTAL,
    RECONNECTS_DENIED_TOTAL, REST_REQUESTS_TOTAL, REST_REQUEST_LATENCY, STREAM_BYTES_TOTAL,
    UNREAD_COUNT,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording transport metrics
pub struct TransportMetrics;

impl TransportMetrics {
    /// Record a push received over pub/sub
    pub fn record_pubsub_push() {
        PUSHES_RECEIVED_TOTAL.with_label_values(&["pubsub"]).inc();
    }

    /// Record a push received over the fallback stream
    pub fn record_stream_push() {
        PUSHES_RECEIVED_TOTAL.with_label_values(&["stream"]).inc();
    }

    /// Record a payload dropped during parsing
    pub fn record_parse_failure(transport: &str) {
        PUSH_PARSE_FAILURES_TOTAL
            .with_label_values(&[transport])
            .inc();
    }

    /// Record bytes consumed from the stream
    pub fn record_stream_bytes(count: u64) {
        STREAM_BYTES_TOTAL.inc_by(count);
    }

    /// Update the connection phase gauge
    pub fn set_phase(phase: i64) {
        CONNECTION_PHASE.set(phase);
    }
}

/// Helper struct for recording reconnect metrics
pub struct ReconnectMetrics;

impl ReconnectMetrics {
    /// Record an allowed reconnect attempt
    pub fn record_allowed() {
        RECONNECTS_ALLOWED_TOTAL.inc();
    }

    /// Record a denied reconnect attempt
    pub fn record_denied() {
        RECONNECTS_DENIED_TOTAL.inc();
    }

    /// Record a fallback from pub/sub to the stream transport
    pub fn record_fallback() {
        FALLBACK_ACTIVATIONS_TOTAL.inc();
    }
}

/// Helper struct for recording store metrics
pub struct StoreMetrics;

impl StoreMetrics {
    /// Update list size and unread gauges
    pub fn set_sizes(items: usize, unread: u64) {
        NOTIFICATIONS_TOTAL.set(items as i64);
        UNREAD_COUNT.set(unread as i64);
    }

    /// Record a notification marked read
    pub fn record_marked_read() {
        MARKED_READ_TOTAL.inc();
    }

    /// Record a page merged with replace semantics
    pub fn record_replace_merge() {
        PAGES_MERGED_TOTAL.with_label_values(&["replace"]).inc();
    }

    /// Record a page merged with append semantics
    pub fn record_append_merge() {
        PAGES_MERGED_TOTAL.with_label_values(&["append"]).inc();
    }
}

/// Helper struct for recording REST metrics
pub struct RestMetrics;

impl RestMetrics {
    /// Record a successful request
    pub fn record_ok(endpoint: &str) {
        REST_REQUESTS_TOTAL
            .with_label_values(&[endpoint, "ok"])
            .inc();
    }

    /// Record a failed request
    pub fn record_error(endpoint: &str) {
        REST_REQUESTS_TOTAL
            .with_label_values(&[endpoint, "error"])
            .inc();
    }

    /// Record request latency
    pub fn record_latency(endpoint: &str, latency_secs: f64) {
        REST_REQUEST_LATENCY
            .with_label_values(&[endpoint])
            .observe(latency_secs);
    }
}

/// Helper struct for desktop bridge metrics
pub struct DesktopMetrics;

impl DesktopMetrics {
    /// Record a desktop notification shown
    pub fn record_notified() {
        DESKTOP_NOTIFICATIONS_TOTAL.inc();
    }

    /// Record a bridge failure
    pub fn record_failure() {
        DESKTOP_FAILURES_TOTAL.inc();
    }
}
