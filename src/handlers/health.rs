//! Health check endpoint
//!
//! Provides a simple liveness check for monitoring and load balancers.

use async_trait::async_trait;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::dispatch::{Handler, RequestContext};
use crate::error::AppResult;

/// Health check handler
///
/// Returns 200 OK with the plain-text body `OK`. Whether health checks feed
/// the request metrics is decided at route registration
/// (`instrumentation.include_health`).
pub struct HealthHandler;

#[async_trait]
impl Handler for HealthHandler {
    async fn call(&self, _ctx: RequestContext) -> AppResult<Response> {
        Ok((StatusCode::OK, "OK").into_response())
    }
}
