use crate::error::AppError;
pub use metrics_exporter_prometheus::PrometheusHandle;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5];

/// Install the process-wide Prometheus recorder backing the `metrics` macros.
///
/// Call once from `main`; the returned handle renders the text exposition
/// format for the `/metrics` route.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle, AppError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            LATENCY_BUCKETS,
        )
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid metric buckets: {}", e)))?
        .install_recorder()
        .map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("Failed to install metrics recorder: {}", e))
        })
}
