//! Prometheus metrics for the notification client.
//!
//! This module provides metrics for monitoring the client:
//! - Transport metrics (pushes received, parse failures, connection phase)
//! - Reconnect metrics (allowed, denied, fallback activations)
//! - Store metrics (list size, unread mirror, merges)
//! - REST metrics (requests by endpoint and outcome, latency)
//! - Desktop bridge metrics

mod helpers;

pub use helpers::{
    encode_metrics, DesktopMetrics, ReconnectMetrics, RestMetrics, StoreMetrics, TransportMetrics,
};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    HistogramVec, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "ara_client";

lazy_static! {
    // ============================================================================
    // Transport Metrics
    // ============================================================================

    /// Push notifications received by transport
    pub static ref PUSHES_RECEIVED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_pushes_received_total", METRIC_PREFIX),
        "Total push notifications received",
        &["transport"]
    ).unwrap();

    /// Push payloads dropped because they failed to parse
    pub static ref PUSH_PARSE_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_push_parse_failures_total", METRIC_PREFIX),
        "Total push payloads dropped due to parse failures",
        &["transport"]
    ).unwrap();

    /// Connection phase (0=idle, 1=selecting, 2=pubsub, 3=stream, 4=reconnect-pending)
    pub static ref CONNECTION_PHASE: IntGauge = register_int_gauge!(
        format!("{}_connection_phase", METRIC_PREFIX),
        "Connection phase (0=idle, 1=selecting, 2=pubsub, 3=stream, 4=reconnect-pending)"
    ).unwrap();

    /// Bytes consumed from the fallback stream
    pub static ref STREAM_BYTES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_stream_bytes_total", METRIC_PREFIX),
        "Total bytes consumed from the fallback stream"
    ).unwrap();

    // ============================================================================
    // Reconnect Metrics
    // ============================================================================

    /// Reconnect attempts allowed by the governor
    pub static ref RECONNECTS_ALLOWED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_reconnects_allowed_total", METRIC_PREFIX),
        "Total reconnect attempts allowed by the governor"
    ).unwrap();

    /// Reconnect attempts denied by the governor
    pub static ref RECONNECTS_DENIED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_reconnects_denied_total", METRIC_PREFIX),
        "Total reconnect attempts denied by the governor"
    ).unwrap();

    /// Times the client fell back from pub/sub to the stream transport
    pub static ref FALLBACK_ACTIVATIONS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_fallback_activations_total", METRIC_PREFIX),
        "Total fallback activations from pub/sub to the stream transport"
    ).unwrap();

    // ============================================================================
    // Store Metrics
    // ============================================================================

    /// Notifications currently held in the store
    pub static ref NOTIFICATIONS_TOTAL: IntGauge = register_int_gauge!(
        format!("{}_notifications_total", METRIC_PREFIX),
        "Notifications currently held in the local store"
    ).unwrap();

    /// Local mirror of the unread counter
    pub static ref UNREAD_COUNT: IntGauge = register_int_gauge!(
        format!("{}_unread_count", METRIC_PREFIX),
        "Local unread notification count"
    ).unwrap();

    /// Notifications marked read locally
    pub static ref MARKED_READ_TOTAL: IntCounter = register_int_counter!(
        format!("{}_marked_read_total", METRIC_PREFIX),
        "Total notifications marked read"
    ).unwrap();

    /// Pages merged into the store by mode
    pub static ref PAGES_MERGED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_pages_merged_total", METRIC_PREFIX),
        "Total pages merged into the store",
        &["mode"]
    ).unwrap();

    // ============================================================================
    // REST Metrics
    // ============================================================================

    /// REST requests by endpoint and outcome
    pub static ref REST_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_rest_requests_total", METRIC_PREFIX),
        "Total REST requests",
        &["endpoint", "outcome"]
    ).unwrap();

    /// REST request latency by endpoint
    pub static ref REST_REQUEST_LATENCY: HistogramVec = register_histogram_vec!(
        format!("{}_rest_request_latency_seconds", METRIC_PREFIX),
        "REST request latency in seconds",
        &["endpoint"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    ).unwrap();

    // ============================================================================
    // Desktop Bridge Metrics
    // ============================================================================

    /// Desktop notifications shown
    pub static ref DESKTOP_NOTIFICATIONS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_desktop_notifications_total", METRIC_PREFIX),
        "Total desktop notifications shown"
    ).unwrap();

    /// Desktop bridge call failures (never surfaced to callers)
    pub static ref DESKTOP_FAILURES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_desktop_failures_total", METRIC_PREFIX),
        "Total desktop bridge failures"
    ).unwrap();
}
