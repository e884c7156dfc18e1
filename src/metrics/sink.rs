//! Telemetry sinks
//!
//! A sink is notified after every successful counter increment and histogram
//! observation. The Prometheus registry itself is always the primary store;
//! sinks let extra exporters ride along without a second instrumentation path.

use std::sync::Arc;

/// Receiver for metric observations
///
/// Both callbacks default to no-ops so an exporter only implements what it
/// cares about. Callbacks run on the request path and must not block.
pub trait TelemetrySink: Send + Sync {
    /// Called after `name{labels}` was incremented by one
    fn counter_incremented(&self, _name: &str, _labels: &[(&str, &str)]) {}

    /// Called after `value` was observed into `name{labels}`
    fn histogram_observed(&self, _name: &str, _labels: &[(&str, &str)], _value: f64) {}
}

/// Shared, immutable list of sinks handed to every metric handle
pub(crate) type Sinks = Arc<[Arc<dyn TelemetrySink>]>;

/// Sink that emits a `debug` tracing event for every observation
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn counter_incremented(&self, name: &str, labels: &[(&str, &str)]) {
        tracing::debug!(metric = name, labels = ?labels, "counter incremented");
    }

    fn histogram_observed(&self, name: &str, labels: &[(&str, &str)], value: f64) {
        tracing::debug!(metric = name, labels = ?labels, value, "histogram observed");
    }
}
