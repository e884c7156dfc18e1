//! Telemetry and observability setup
//!
//! Configures structured logging with tracing and tracing-subscriber.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Filter directives used when `RUST_LOG` is unset
///
/// Applies `level` to this crate and to tower-http's per-request spans;
/// everything else stays at the subscriber default (errors only).
pub fn default_directives(level: &str) -> String {
    format!("metered_demo={level},tower_http={level}")
}

/// Initialize tracing subscriber for structured logging
///
/// This can only be called once per process. Subsequent calls are silently ignored.
///
/// `RUST_LOG` takes precedence; otherwise `default_level` (from
/// `[observability] log_level`) is applied via [`default_directives`].
///
/// # Examples
///
/// ```no_run
/// metered_demo::telemetry::init("info");
/// tracing::info!("Application started");
/// ```
pub fn init(default_level: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives(default_level)));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    });
}
