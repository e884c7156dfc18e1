//! Error types for metered-demo
//!
//! All errors implement `IntoResponse` so handlers can bubble them up with `?`.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Metric '{name}' is already registered as {existing}, cannot re-register as {requested}")]
    MetricSchemaConflict {
        name: String,
        existing: String,
        requested: String,
    },

    #[error("Metric '{name}' rejected observation {value}: values must be finite and non-negative")]
    InvalidObservation { name: String, value: f64 },

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Invalid route pattern '{pattern}': {reason}")]
    InvalidRoutePattern { pattern: String, reason: String },

    #[error("Route {method} {pattern} is registered twice")]
    DuplicateRoute { method: String, pattern: String },

    #[error("Invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Not Found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            // Malformed client input is answered with a bare status, no body
            Self::InvalidJson(_) => StatusCode::BAD_REQUEST.into_response(),
            Self::NotFound => (
                StatusCode::NOT_FOUND,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                "Not Found",
            )
                .into_response(),
            other => {
                let body = Json(serde_json::json!({
                    "error": other.to_string(),
                }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;
