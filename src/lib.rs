//! metered-demo - Demo HTTP service instrumented with Prometheus request metrics
//!
//! A handful of demo endpoints run behind a small dispatcher that counts and
//! times every request per (method, endpoint[, status]) and exposes the result
//! in the Prometheus text format.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod server;
pub mod system;
pub mod telemetry;
