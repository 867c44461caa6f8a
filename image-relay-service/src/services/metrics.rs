//! Metrics collection and Prometheus export.
//!
//! Initializes the metrics exporter and provides the /metrics endpoint handler.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

static INSTALL_LOCK: Mutex<()> = Mutex::new(());

/// Initialize the metrics recorder.
///
/// Must be called once at startup before any metrics are recorded. Later
/// calls are ignored.
pub fn init_metrics() -> Result<(), BuildError> {
    // Serializes concurrent callers so only one recorder install is attempted
    let _guard = INSTALL_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = METRICS_HANDLE.set(handle);
    Ok(())
}

/// Get the current metrics in Prometheus text format.
///
/// Returns a string suitable for the /metrics HTTP endpoint.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

/// Record the outcome and latency of one upstream model call.
pub fn record_upstream_call(provider: &str, model: &str, outcome: &str, elapsed: Duration) {
    metrics::counter!(
        "relay_upstream_requests_total",
        "provider" => provider.to_string(),
        "model" => model.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "relay_upstream_latency_seconds",
        "provider" => provider.to_string(),
        "model" => model.to_string()
    )
    .record(elapsed.as_secs_f64());
}
