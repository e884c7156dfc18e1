//! Data submission endpoint
//!
//! Accepts any JSON document, simulates processing, and echoes it back.

use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

use crate::dispatch::{Handler, RequestContext};
use crate::error::AppResult;

/// Acknowledgement body: `{"status":"received","data":<body>}`
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub status: &'static str,
    pub data: Value,
}

/// `POST /submit`
///
/// # Response
///
/// - `201 Created` with [`SubmitResponse`] after the simulated delay
/// - `400 Bad Request` with an empty body if the request body is not JSON
///   (returned immediately, without the delay)
pub struct SubmitHandler {
    delay: Duration,
}

impl SubmitHandler {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Handler for SubmitHandler {
    async fn call(&self, ctx: RequestContext) -> AppResult<Response> {
        let data: Value = serde_json::from_slice(&ctx.body).inspect_err(|e| {
            tracing::debug!(error = %e, body_len = ctx.body.len(), "Rejected non-JSON submission");
        })?;

        tracing::info!(data = %data, "Received data");

        // Simulated work
        tokio::time::sleep(self.delay).await;

        Ok((
            StatusCode::CREATED,
            Json(SubmitResponse {
                status: "received",
                data,
            }),
        )
            .into_response())
    }
}
