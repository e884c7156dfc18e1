//! Resource deletion endpoint

use std::time::Duration;

use async_trait::async_trait;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::dispatch::{Handler, RequestContext};
use crate::error::{AppError, AppResult};

/// `DELETE /resource/{id:int}`
///
/// Nothing is stored, so deletion always succeeds with `204 No Content`
/// after the simulated delay.
pub struct DeleteResourceHandler {
    delay: Duration,
}

impl DeleteResourceHandler {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Handler for DeleteResourceHandler {
    async fn call(&self, ctx: RequestContext) -> AppResult<Response> {
        // The route pattern only matches digits; a missing id means the
        // handler was bound to the wrong pattern.
        let id = ctx.params.digits("id").ok_or(AppError::NotFound)?;

        tracing::info!(resource_id = %id, "Deleting resource");
        tokio::time::sleep(self.delay).await;

        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
