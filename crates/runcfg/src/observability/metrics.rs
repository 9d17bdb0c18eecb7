//! Metrics for the metadata loader.
//!
//! All metrics follow Prometheus naming conventions:
//! - `runcfg_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! - `endpoint`: 6 values, one per fetch target label
//! - `status`: 3 values (success, error, cancelled)

use super::resource::Resource;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder and return the handle used to render
/// `/metrics`.
///
/// Every resource attribute becomes a global label, with characters that
/// are not valid in Prometheus label names replaced by `_`.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder(resource: &Resource) -> Result<PrometheusHandle, String> {
    let mut builder = PrometheusBuilder::new()
        // The metadata server answers locally; anything past 1s is an outage.
        .set_buckets_for_metric(
            Matcher::Prefix("runcfg_metadata_fetch".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500,
            ],
        )
        .map_err(|e| format!("Failed to set metadata fetch buckets: {e}"))?;

    for (key, value) in resource.attributes() {
        builder = builder.add_global_label(label_name(key), value.clone());
    }

    builder
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

/// Convert an attribute key such as `cloud.region` to a valid label name.
fn label_name(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

// ============================================================================
// Metadata Fetch Metrics
// ============================================================================

/// Record one metadata server fetch.
///
/// Metric: `runcfg_metadata_fetch_total`, `runcfg_metadata_fetch_duration_seconds`
/// Labels: `endpoint`, `status`
pub fn record_metadata_fetch(endpoint: &'static str, status: &'static str, duration: Duration) {
    histogram!("runcfg_metadata_fetch_duration_seconds",
        "endpoint" => endpoint
    )
    .record(duration.as_secs_f64());

    counter!("runcfg_metadata_fetch_total",
        "endpoint" => endpoint,
        "status" => status
    )
    .increment(1);
}
