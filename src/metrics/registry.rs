//! Process-wide metrics registry
//!
//! Wraps a Prometheus [`Registry`] with schema bookkeeping so that a metric
//! name is bound to exactly one kind, label schema, and bucket layout for the
//! life of the process. Series are created lazily on first observation by the
//! underlying `*Vec` collectors; each series is an independent atomic, so
//! concurrent writers never contend on a registry-wide lock.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use prometheus::core::Collector;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

use super::sink::{Sinks, TelemetrySink};
use crate::error::{AppError, AppResult};

/// Default latency buckets in seconds
pub const DEFAULT_LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Kind and shape a metric name was registered with
#[derive(Debug, Clone, PartialEq)]
enum Schema {
    Counter {
        labels: Vec<String>,
    },
    Histogram {
        labels: Vec<String>,
        buckets: Vec<f64>,
    },
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schema::Counter { labels } => write!(f, "counter[{}]", labels.join(", ")),
            Schema::Histogram { labels, buckets } => {
                write!(f, "histogram[{}] buckets {:?}", labels.join(", "), buckets)
            }
        }
    }
}

enum Registered {
    Counter(CounterHandle),
    Histogram(HistogramHandle),
}

struct Entry {
    schema: Schema,
    metric: Registered,
}

/// Registry owning every application metric and the exposition encoding
pub struct MetricsRegistry {
    registry: Registry,
    entries: Mutex<HashMap<String, Entry>>,
    sinks: Sinks,
}

impl MetricsRegistry {
    /// Create a registry with no telemetry sinks
    pub fn new() -> Self {
        Self::with_sinks(Vec::new())
    }

    /// Create a registry that notifies `sinks` on every observation
    pub fn with_sinks(sinks: Vec<Arc<dyn TelemetrySink>>) -> Self {
        Self {
            registry: Registry::new(),
            entries: Mutex::new(HashMap::new()),
            sinks: Arc::from(sinks),
        }
    }

    /// Register a counter keyed by `label_keys`
    ///
    /// Registering the same name again with an identical schema returns a
    /// handle to the existing counter.
    ///
    /// # Errors
    ///
    /// `MetricSchemaConflict` if the name is already bound to another kind or
    /// label schema; `Metrics` if Prometheus rejects the name or labels.
    pub fn register_counter(
        &self,
        name: &str,
        help: &str,
        label_keys: &[&str],
    ) -> AppResult<CounterHandle> {
        let schema = Schema::Counter {
            labels: owned(label_keys),
        };

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = entries.get(name) {
            return match (&existing.metric, existing.schema == schema) {
                (Registered::Counter(handle), true) => Ok(handle.clone()),
                _ => Err(conflict(name, &existing.schema, &schema)),
            };
        }

        let vec = IntCounterVec::new(Opts::new(name, help), label_keys)?;
        self.registry.register(Box::new(vec.clone()))?;

        let handle = CounterHandle {
            name: Arc::from(name),
            label_keys: Arc::from(owned(label_keys)),
            inner: vec,
            sinks: Arc::clone(&self.sinks),
        };
        entries.insert(
            name.to_string(),
            Entry {
                schema,
                metric: Registered::Counter(handle.clone()),
            },
        );
        tracing::debug!(metric = name, labels = ?label_keys, "registered counter");
        Ok(handle)
    }

    /// Register a histogram with [`DEFAULT_LATENCY_BUCKETS`]
    pub fn register_histogram(
        &self,
        name: &str,
        help: &str,
        label_keys: &[&str],
    ) -> AppResult<HistogramHandle> {
        self.register_histogram_with_buckets(name, help, label_keys, DEFAULT_LATENCY_BUCKETS.to_vec())
    }

    /// Register a histogram with explicit upper bounds
    ///
    /// The bounds are shared by every label combination of the metric. An
    /// implicit `+Inf` overflow bucket is always present.
    pub fn register_histogram_with_buckets(
        &self,
        name: &str,
        help: &str,
        label_keys: &[&str],
        buckets: Vec<f64>,
    ) -> AppResult<HistogramHandle> {
        let schema = Schema::Histogram {
            labels: owned(label_keys),
            buckets: buckets.clone(),
        };

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = entries.get(name) {
            return match (&existing.metric, existing.schema == schema) {
                (Registered::Histogram(handle), true) => Ok(handle.clone()),
                _ => Err(conflict(name, &existing.schema, &schema)),
            };
        }

        let vec = HistogramVec::new(HistogramOpts::new(name, help).buckets(buckets), label_keys)?;
        self.registry.register(Box::new(vec.clone()))?;

        let handle = HistogramHandle {
            name: Arc::from(name),
            label_keys: Arc::from(owned(label_keys)),
            inner: vec,
            sinks: Arc::clone(&self.sinks),
        };
        entries.insert(
            name.to_string(),
            Entry {
                schema,
                metric: Registered::Histogram(handle.clone()),
            },
        );
        tracing::debug!(metric = name, labels = ?label_keys, "registered histogram");
        Ok(handle)
    }

    /// Register an externally defined collector (e.g. process metrics)
    pub fn register_collector(&self, collector: Box<dyn Collector>) -> AppResult<()> {
        self.registry.register(collector)?;
        Ok(())
    }

    /// Media type of [`render`](Self::render) output
    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }

    /// Serialize every observed series in the Prometheus text format
    ///
    /// Metrics that have never been observed produce no sample lines.
    ///
    /// # Errors
    ///
    /// Returns an error if metric encoding fails.
    pub fn render(&self) -> AppResult<String> {
        let metric_families = self.registry.gather();
        let metric_count = metric_families.len();

        tracing::debug!(
            metric_family_count = metric_count,
            "Encoding metrics to Prometheus text format"
        );

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|e| {
                let metric_names: Vec<_> = metric_families.iter().map(|mf| mf.name()).collect();
                tracing::error!(
                    error = %e,
                    metric_family_count = metric_count,
                    metric_names = ?metric_names,
                    "Prometheus text encoder failed"
                );
                e
            })?;

        String::from_utf8(buffer).map_err(|e| {
            let valid_up_to = e.utf8_error().valid_up_to();
            tracing::error!(
                invalid_byte_index = valid_up_to,
                "Prometheus encoder produced invalid UTF-8"
            );
            AppError::Internal(format!(
                "metrics output is not valid UTF-8 at byte {}",
                valid_up_to
            ))
        })
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a registered counter
///
/// Cheap to clone; all clones update the same series.
#[derive(Clone)]
pub struct CounterHandle {
    name: Arc<str>,
    label_keys: Arc<[String]>,
    inner: IntCounterVec,
    sinks: Sinks,
}

impl CounterHandle {
    /// Add one to the series for `label_values`, creating it at zero if absent
    ///
    /// # Errors
    ///
    /// Returns an error if the number of values differs from the label schema.
    pub fn increment(&self, label_values: &[&str]) -> AppResult<()> {
        self.inner.get_metric_with_label_values(label_values)?.inc();

        if !self.sinks.is_empty() {
            let labels = pairs(&self.label_keys, label_values);
            for sink in self.sinks.iter() {
                sink.counter_incremented(&self.name, &labels);
            }
        }
        Ok(())
    }

    /// Metric name this handle writes to
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Handle to a registered histogram
#[derive(Clone)]
pub struct HistogramHandle {
    name: Arc<str>,
    label_keys: Arc<[String]>,
    inner: HistogramVec,
    sinks: Sinks,
}

impl HistogramHandle {
    /// Record `value_seconds` into the series for `label_values`
    ///
    /// # Errors
    ///
    /// `InvalidObservation` for NaN, infinite, or negative values (they would
    /// corrupt `_sum` and every derived quantile); `Metrics` on a label
    /// cardinality mismatch.
    pub fn observe(&self, label_values: &[&str], value_seconds: f64) -> AppResult<()> {
        if !value_seconds.is_finite() || value_seconds < 0.0 {
            return Err(AppError::InvalidObservation {
                name: self.name.to_string(),
                value: value_seconds,
            });
        }

        self.inner
            .get_metric_with_label_values(label_values)?
            .observe(value_seconds);

        if !self.sinks.is_empty() {
            let labels = pairs(&self.label_keys, label_values);
            for sink in self.sinks.iter() {
                sink.histogram_observed(&self.name, &labels, value_seconds);
            }
        }
        Ok(())
    }

    /// Metric name this handle writes to
    pub fn name(&self) -> &str {
        &self.name
    }
}

fn owned(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

fn pairs<'a>(keys: &'a [String], values: &[&'a str]) -> Vec<(&'a str, &'a str)> {
    keys.iter().map(String::as_str).zip(values.iter().copied()).collect()
}

fn conflict(name: &str, existing: &Schema, requested: &Schema) -> AppError {
    tracing::error!(
        metric = name,
        existing = %existing,
        requested = %requested,
        "metric registered twice with different schemas"
    );
    AppError::MetricSchemaConflict {
        name: name.to_string(),
        existing: existing.to_string(),
        requested: requested.to_string(),
    }
}
