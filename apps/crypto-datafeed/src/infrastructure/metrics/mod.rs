//! Prometheus Metrics Module
//!
//! Counters and gauges for the datafeed.
//!
//! # Metrics Categories
//!
//! - **API**: CryptoCompare requests by endpoint and outcome, plus latency
//! - **History**: Bars fetched for chart history
//! - **Streaming**: Bar updates delivered and poll failures
//! - **Subscriptions**: Active subscribers and polled channels
//!
//! # Integration
//!
//! When a listen address is given, metrics are served at `/metrics` by the
//! exporter's own HTTP listener. Otherwise they are only rendered in-process.

use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder.
///
/// With `listen_addr` the exporter serves `/metrics` itself and no in-process
/// handle is kept. Must be called from inside a Tokio runtime in that case.
///
/// # Errors
///
/// Returns an error if a global recorder is already installed or the
/// listener cannot be set up.
pub fn init_metrics(listen_addr: Option<SocketAddr>) -> Result<(), BuildError> {
    match listen_addr {
        Some(addr) => {
            PrometheusBuilder::new().with_http_listener(addr).install()?;
            tracing::info!(%addr, "Prometheus exporter listening");
        }
        None => {
            let handle = PrometheusBuilder::new().install_recorder()?;
            let _ = PROMETHEUS_HANDLE.set(handle);
        }
    }

    register_metrics();
    Ok(())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics were not initialized or are served over HTTP.
#[must_use]
pub fn metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "crypto_datafeed_api_requests_total",
        "CryptoCompare API requests by endpoint and outcome"
    );
    describe_histogram!(
        "crypto_datafeed_api_request_seconds",
        "CryptoCompare API request latency"
    );

    describe_counter!(
        "crypto_datafeed_history_bars_total",
        "Daily bars fetched from history requests"
    );

    describe_counter!(
        "crypto_datafeed_stream_updates_total",
        "Bar updates delivered to subscriber handlers"
    );
    describe_counter!(
        "crypto_datafeed_stream_poll_errors_total",
        "Failed price polls"
    );

    describe_gauge!(
        "crypto_datafeed_subscribers",
        "Number of active bar subscribers"
    );
    describe_gauge!(
        "crypto_datafeed_channels",
        "Number of channels being polled"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// API endpoint label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiEndpoint {
    /// Exchange/pair catalog.
    Exchanges,
    /// Daily history.
    HistoDay,
    /// Latest price.
    Price,
}

impl ApiEndpoint {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Exchanges => "exchanges",
            Self::HistoDay => "histoday",
            Self::Price => "price",
        }
    }
}

/// Request outcome label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 2xx response with a parsable body.
    Success,
    /// Non-2xx response.
    HttpError,
    /// Transport failure.
    NetworkError,
}

impl Outcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::HttpError => "http_error",
            Self::NetworkError => "network_error",
        }
    }
}

/// Record a completed API request.
pub fn record_api_request(endpoint: ApiEndpoint, outcome: Outcome, duration: Duration) {
    counter!(
        "crypto_datafeed_api_requests_total",
        "endpoint" => endpoint.as_str(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
    histogram!(
        "crypto_datafeed_api_request_seconds",
        "endpoint" => endpoint.as_str()
    )
    .record(duration.as_secs_f64());
}

/// Record bars returned by a history request.
pub fn record_history_bars(count: u64) {
    counter!("crypto_datafeed_history_bars_total").increment(count);
}

/// Record bar updates delivered to handlers.
pub fn record_stream_updates(count: u64) {
    counter!("crypto_datafeed_stream_updates_total").increment(count);
}

/// Record a failed price poll.
pub fn record_poll_error() {
    counter!("crypto_datafeed_stream_poll_errors_total").increment(1);
}

/// Update subscriber and channel gauges.
#[allow(clippy::cast_precision_loss)]
pub fn set_subscriptions(subscribers: usize, channels: usize) {
    gauge!("crypto_datafeed_subscribers").set(subscribers as f64);
    gauge!("crypto_datafeed_channels").set(channels as f64);
}

// =============================================================================
// Tests
// =============================================================================
