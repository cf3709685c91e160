//! Prometheus Metrics Module
//!
//! Exposes ingestion and query metrics in Prometheus format.
//!
//! # Metrics Categories
//!
//! - **Ingestion**: Tick outcomes per symbol, fetch and write latency
//! - **Queries**: Window query latency and failures
//! - **Refresh**: Refresh loop outcomes
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the HTTP server port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Calling it again returns the handle installed by the first call.
///
/// # Errors
///
/// Returns an error if the recorder cannot be installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "smd_ticks_total",
        "Ingestion ticks by symbol and outcome"
    );
    describe_histogram!(
        "smd_fetch_duration_seconds",
        "Time spent fetching a quote from the provider"
    );
    describe_histogram!(
        "smd_write_duration_seconds",
        "Time spent appending a snapshot to the store"
    );
    describe_gauge!(
        "smd_symbols_in_flight",
        "Symbols with a fetch or write currently in progress"
    );

    describe_histogram!(
        "smd_query_duration_seconds",
        "Time spent on window queries against the store"
    );
    describe_counter!("smd_query_errors_total", "Failed window queries");

    describe_counter!(
        "smd_refresh_total",
        "Refresh loop iterations by outcome"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Outcome label of one ingestion tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Snapshot fetched and appended.
    Written,
    /// Provider call failed.
    FetchFailed,
    /// Store append failed.
    WriteFailed,
    /// Previous tick still in flight.
    Skipped,
}

impl TickOutcome {
    /// Label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Written => "written",
            Self::FetchFailed => "fetch_failed",
            Self::WriteFailed => "write_failed",
            Self::Skipped => "skipped",
        }
    }
}

/// Record the outcome of one tick.
pub fn record_tick(symbol: &str, outcome: TickOutcome) {
    counter!(
        "smd_ticks_total",
        "symbol" => symbol.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

/// Record provider call latency.
pub fn record_fetch_duration(symbol: &str, duration: Duration) {
    histogram!(
        "smd_fetch_duration_seconds",
        "symbol" => symbol.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record store append latency.
pub fn record_write_duration(duration: Duration) {
    histogram!("smd_write_duration_seconds").record(duration.as_secs_f64());
}

/// Track ticks entering and leaving flight.
pub fn adjust_in_flight(delta: f64) {
    gauge!("smd_symbols_in_flight").increment(delta);
}

/// Record window query latency.
pub fn record_query_duration(duration: Duration) {
    histogram!("smd_query_duration_seconds").record(duration.as_secs_f64());
}

/// Record a failed window query.
pub fn record_query_error() {
    counter!("smd_query_errors_total").increment(1);
}

/// Record one refresh loop iteration.
pub fn record_refresh(ready: bool) {
    counter!(
        "smd_refresh_total",
        "outcome" => if ready { "ready" } else { "stale" }
    )
    .increment(1);
}

// =============================================================================
// Tests
// =============================================================================
