//! Prometheus metrics for metered-demo
//!
//! This module provides the metrics registry and the request instrumentation
//! metrics recorded around every business handler:
//! - Request counts by method, endpoint, and HTTP status
//! - Request latency by method and endpoint
//!
//! Metrics are exposed via the scrape endpoint in Prometheus text format.

pub mod registry;
pub mod sink;

pub use registry::{CounterHandle, HistogramHandle, MetricsRegistry, DEFAULT_LATENCY_BUCKETS};
pub use sink::{LogSink, TelemetrySink};

use std::time::Duration;

use axum::http::{Method, StatusCode};

use crate::config::MetricsConfig;
use crate::error::AppResult;

/// Request count and latency metrics shared by all instrumented handlers
///
/// The `endpoint` label is always a route template, never a concrete path,
/// so cardinality is bounded by the route table.
#[derive(Clone)]
pub struct RequestMetrics {
    requests: CounterHandle,
    latency: HistogramHandle,
    recording_failures: CounterHandle,
}

impl RequestMetrics {
    /// Register the request metrics under `config.namespace`
    ///
    /// # Errors
    ///
    /// Returns `MetricSchemaConflict` if the names are already taken with a
    /// different schema. This is a startup configuration error.
    pub fn register(registry: &MetricsRegistry, config: &MetricsConfig) -> AppResult<Self> {
        let ns = &config.namespace;

        let requests = registry.register_counter(
            &format!("{}_request_count", ns),
            "Application Request Count",
            &["method", "endpoint", "http_status"],
        )?;

        let latency = registry.register_histogram_with_buckets(
            &format!("{}_request_latency_seconds", ns),
            "Application Request Latency",
            &["method", "endpoint"],
            config.latency_buckets.clone(),
        )?;

        // Counter: failures inside record() itself (label mismatch, bad duration)
        let recording_failures = registry.register_counter(
            &format!("{}_metrics_recording_failures_total", ns),
            "Total number of failed metric recordings by metric name. \
            Any increment indicates an instrumentation bug.",
            &["metric"],
        )?;

        Ok(Self {
            requests,
            latency,
            recording_failures,
        })
    }

    /// Record one completed request
    ///
    /// Never fails: recording errors are logged and counted so that telemetry
    /// problems cannot turn into failed responses.
    pub fn record(&self, method: &Method, endpoint: &str, status: StatusCode, elapsed: Duration) {
        let status_label = status.as_u16().to_string();

        if let Err(e) = self
            .requests
            .increment(&[method.as_str(), endpoint, &status_label])
        {
            self.recording_failed(self.requests.name(), &e);
        }

        if let Err(e) = self
            .latency
            .observe(&[method.as_str(), endpoint], elapsed.as_secs_f64())
        {
            self.recording_failed(self.latency.name(), &e);
        }
    }

    fn recording_failed(&self, metric: &str, error: &crate::error::AppError) {
        tracing::warn!(metric, error = %error, "Failed to record request metric");
        if let Err(e) = self.recording_failures.increment(&[metric]) {
            tracing::error!(error = %e, "Failed to record metrics recording failure");
        }
    }
}

/// Attach `process_*` metrics for the current process where supported
pub fn register_process_collector(registry: &MetricsRegistry) -> AppResult<()> {
    #[cfg(target_os = "linux")]
    {
        let collector = prometheus::process_collector::ProcessCollector::for_self();
        registry.register_collector(Box::new(collector))?;
        tracing::debug!("Registered process metrics collector");
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = registry;
        tracing::debug!("Process metrics are only available on Linux, skipping");
    }
    Ok(())
}
