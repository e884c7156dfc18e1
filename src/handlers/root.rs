//! Landing page

use async_trait::async_trait;
use axum::response::{Html, IntoResponse, Response};

use crate::dispatch::{Handler, RequestContext};
use crate::error::AppResult;

/// Static greeting served at `/`
pub const INDEX_HTML: &str = "<html><body><h1>Hello from simple server</h1></body></html>";

pub struct RootHandler;

#[async_trait]
impl Handler for RootHandler {
    async fn call(&self, _ctx: RequestContext) -> AppResult<Response> {
        Ok(Html(INDEX_HTML).into_response())
    }
}
