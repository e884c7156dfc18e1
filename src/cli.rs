//! Command-line interface for metered-demo
//!
//! Provides argument parsing and subcommand handling for the metered-demo binary.

use clap::{Parser, Subcommand};

/// Demo HTTP service with Prometheus request metrics
#[derive(Parser)]
#[command(name = "metered-demo")]
#[command(version)]
#[command(about = "Demo HTTP service with Prometheus request metrics")]
#[command(
    long_about = "metered-demo serves a handful of demo endpoints and records a request \
    counter and a latency histogram for each of them, exposed for Prometheus scraping."
)]
pub struct Cli {
    /// Path to configuration file (built-in defaults are used when omitted)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Port to listen on, overriding `server.port`
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
///
/// The template parses to exactly [`Config::default()`](crate::config::Config).
pub fn generate_config_template() -> &'static str {
    r#"# metered-demo Configuration
# ==========================
#
# Every setting below shows its default value. Delete any line to keep the
# default; an empty file is a valid configuration.

# ─────────────────────────────────────────────────────────────────────────────
# SERVER CONFIGURATION
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "0.0.0.0"

# Port to listen on (the --port flag and PORT environment variable override this)
port = 8080

# Request bodies larger than this many bytes are rejected with 413
max_body_bytes = 1048576

# ─────────────────────────────────────────────────────────────────────────────
# METRICS
# ─────────────────────────────────────────────────────────────────────────────

[metrics]
# Prefix for metric names: <namespace>_request_count, <namespace>_request_latency_seconds
namespace = "metered_demo"

# Path of the Prometheus scrape endpoint
path = "/metrics"

# Upper bounds (seconds) of the request latency histogram; strictly increasing
latency_buckets = [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]

# Expose process_* metrics (CPU time, resident memory, open fds). Linux only.
process_metrics = true

# Emit a debug log event for every recorded observation
log_observations = false

# ─────────────────────────────────────────────────────────────────────────────
# INSTRUMENTATION
# ─────────────────────────────────────────────────────────────────────────────

[instrumentation]
# Count and time GET /health like any other endpoint
include_health = true

# Record requests answered with a 4xx status (e.g. invalid JSON on /submit)
record_rejected = false

# ─────────────────────────────────────────────────────────────────────────────
# SIMULATED WORK
# ─────────────────────────────────────────────────────────────────────────────

[simulation]
# Processing delay for POST /submit, in milliseconds (max 60000)
submit_delay_ms = 500

# Processing delay for DELETE /resource/<id>, in milliseconds (max 60000)
delete_delay_ms = 200

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
# RUST_LOG takes precedence when set
log_level = "info"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        // Clap's built-in verification for the CLI structure
        Cli::command().debug_assert();
    }

    #[test]
    fn no_config_path_by_default() {
        let cli = Cli::try_parse_from(["metered-demo"]).unwrap();
        assert!(cli.config.is_none());
        assert!(cli.command.is_none());
    }

    #[test]
    fn custom_config_path() {
        let cli = Cli::parse_from(["metered-demo", "--config", "custom.toml"]);
        assert_eq!(cli.config.as_deref(), Some("custom.toml"));
    }

    #[test]
    fn port_flag() {
        let cli = Cli::parse_from(["metered-demo", "--port", "9090"]);
        assert_eq!(cli.port, Some(9090));
    }

    #[test]
    fn invalid_port_is_rejected() {
        assert!(Cli::try_parse_from(["metered-demo", "--port", "70000"]).is_err());
        assert!(Cli::try_parse_from(["metered-demo", "--port", "http"]).is_err());
    }

    #[test]
    fn config_subcommand() {
        let cli = Cli::parse_from(["metered-demo", "config"]);
        assert!(matches!(
            cli.command,
            Some(Command::Config { output: None })
        ));
    }

    #[test]
    fn config_subcommand_with_output() {
        let cli = Cli::parse_from(["metered-demo", "config", "-o", "my-config.toml"]);
        assert!(matches!(
            cli.command,
            Some(Command::Config { output: Some(ref path) }) if path == "my-config.toml"
        ));
    }

    #[test]
    fn template_parses_to_defaults() {
        let config: Config = generate_config_template()
            .parse()
            .expect("template should be a valid config");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn template_has_all_sections() {
        let template = generate_config_template();
        for section in [
            "[server]",
            "[metrics]",
            "[instrumentation]",
            "[simulation]",
            "[observability]",
        ] {
            assert!(template.contains(section), "missing {section}");
        }
    }
}
