//! Configuration management for metered-demo
//!
//! Parses TOML configuration files and provides typed access to settings.
//! Every field has a default, so an empty file (or no file) is a valid config.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::error::{AppError, AppResult};
use crate::metrics::DEFAULT_LATENCY_BUCKETS;

/// Longest simulated processing delay accepted from config
const MAX_SIMULATED_DELAY_MS: u64 = 60_000;

/// Paths served by the dispatcher; the scrape endpoint may not shadow them
const APPLICATION_PATHS: &[&str] = &["/", "/health", "/resources", "/submit"];

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub metrics: MetricsConfig,
    pub instrumentation: InstrumentationConfig,
    pub simulation: SimulationConfig,
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Request bodies larger than this are rejected with 413
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Metrics registry and scrape endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    /// Prefix for every application metric name
    pub namespace: String,
    /// Mount point of the scrape endpoint
    pub path: String,
    /// Upper bounds (seconds) of the request latency histogram
    pub latency_buckets: Vec<f64>,
    /// Expose `process_*` metrics (Linux only)
    pub process_metrics: bool,
    /// Attach the logging telemetry sink
    pub log_observations: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            namespace: "metered_demo".to_string(),
            path: "/metrics".to_string(),
            latency_buckets: DEFAULT_LATENCY_BUCKETS.to_vec(),
            process_metrics: true,
            log_observations: false,
        }
    }
}

/// Which requests feed the request count and latency metrics
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct InstrumentationConfig {
    /// Count and time `GET /health`
    pub include_health: bool,
    /// Count and time 4xx responses (invalid JSON on `/submit`)
    pub record_rejected: bool,
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self {
            include_health: true,
            record_rejected: false,
        }
    }
}

/// Artificial processing delays
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub submit_delay_ms: u64,
    pub delete_delay_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            submit_delay_ms: 500,
            delete_delay_ms: 200,
        }
    }
}

impl SimulationConfig {
    pub fn submit_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.submit_delay_ms)
    }

    pub fn delete_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.delete_delay_ms)
    }
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ObservabilityConfig {
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        // Phase 1: Read file (preserves io::Error context)
        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        // Phase 2: Parse TOML (preserves toml::de::Error context)
        let config: Self = toml::from_str(&content).map_err(|source| {
            AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            }
        })?;

        // Phase 3: Validate parsed config (provides contextual reason)
        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Validate configuration after parsing
    ///
    /// This is called automatically by `from_file()` and `from_str()`, but can
    /// also be called explicitly when constructing Config in code.
    pub fn validate(&self) -> AppResult<()> {
        if self.server.max_body_bytes == 0 {
            return Err(AppError::Config(
                "server.max_body_bytes must be greater than 0".to_string(),
            ));
        }

        let ns = &self.metrics.namespace;
        if !is_metric_name(ns) {
            return Err(AppError::Config(format!(
                "metrics.namespace '{}' is not a valid Prometheus metric name prefix \
                (expected [a-zA-Z_:][a-zA-Z0-9_:]*)",
                ns
            )));
        }

        let path = &self.metrics.path;
        if !path.starts_with('/') || path == "/" {
            return Err(AppError::Config(format!(
                "metrics.path '{}' must start with '/' and name a sub-path",
                path
            )));
        }
        // Mounted as a literal axum route; axum panics on route syntax
        if path.contains(['{', '}', '*']) || path.contains("//") || path.contains("/:") {
            return Err(AppError::Config(format!(
                "metrics.path '{}' must be a literal path: no '{{', '}}', '*', \
                ':'-prefixed or empty segments",
                path
            )));
        }
        if APPLICATION_PATHS.contains(&path.as_str()) || path.starts_with("/resource/") {
            return Err(AppError::Config(format!(
                "metrics.path '{}' collides with an application route",
                path
            )));
        }

        let buckets = &self.metrics.latency_buckets;
        if buckets.is_empty() {
            return Err(AppError::Config(
                "metrics.latency_buckets must contain at least one bound".to_string(),
            ));
        }
        if buckets.iter().any(|b| !b.is_finite() || *b <= 0.0) {
            return Err(AppError::Config(format!(
                "metrics.latency_buckets must be finite positive numbers, got {:?}",
                buckets
            )));
        }
        if buckets.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AppError::Config(format!(
                "metrics.latency_buckets must be strictly increasing, got {:?}",
                buckets
            )));
        }

        for (name, delay) in [
            ("submit_delay_ms", self.simulation.submit_delay_ms),
            ("delete_delay_ms", self.simulation.delete_delay_ms),
        ] {
            if delay > MAX_SIMULATED_DELAY_MS {
                return Err(AppError::Config(format!(
                    "simulation.{} cannot exceed {} ms, got {}",
                    name, MAX_SIMULATED_DELAY_MS, delay
                )));
            }
        }

        let level = self.observability.log_level.as_str();
        if !["trace", "debug", "info", "warn", "error"].contains(&level) {
            return Err(AppError::Config(format!(
                "observability.log_level must be one of trace, debug, info, warn, error; got '{}'",
                level
            )));
        }

        Ok(())
    }
}

fn is_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        // Validate config before returning
        config.validate()?;
        Ok(config)
    }
}
