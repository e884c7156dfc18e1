//! Request ID middleware for distributed tracing
//!
//! Tags every request with an id (the caller's `x-request-id` when it sent a
//! usable one, a fresh UUID v4 otherwise), exposes it through Axum extensions,
//! echoes it on the response, and emits one access-log event per request.

use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::handlers::AppState;

/// Request ID header name
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest caller-supplied id that is propagated unchanged
const MAX_REQUEST_ID_LEN: usize = 128;

/// Request ID wrapper type for Axum extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a new random request ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Reuse the caller's id when it is a short, visible-ASCII header value
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
            .map(|id| Self(id.to_string()))
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Health probes and scrapes arrive constantly; keep them out of the info log
fn is_quiet_path(path: &str, metrics_path: &str) -> bool {
    path == "/health" || path == metrics_path
}

/// Middleware that attaches a request ID and logs each completed request
pub async fn request_id_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let request_id = RequestId::from_headers(request.headers());
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    request.extensions_mut().insert(request_id.clone());

    let mut response = next.run(request).await;

    let status = response.status().as_u16();
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    if is_quiet_path(&path, &state.config().metrics.path) {
        tracing::debug!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status,
            elapsed_ms,
            "Request completed"
        );
    } else {
        tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status,
            elapsed_ms,
            "Request completed"
        );
    }

    // Add request ID to response headers for client correlation
    if let Ok(header_value) = HeaderValue::from_str(request_id.as_str()) {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER, header_value);
    }

    response
}
