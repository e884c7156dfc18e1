//! Host resource usage endpoint

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::dispatch::{Handler, RequestContext};
use crate::error::AppResult;
use crate::system::{ResourceProbe, ResourceUsage};

/// Reports CPU utilisation and used memory as plain text
pub struct ResourcesHandler {
    probe: Arc<dyn ResourceProbe>,
}

impl ResourcesHandler {
    pub fn new(probe: Arc<dyn ResourceProbe>) -> Self {
        Self { probe }
    }
}

/// Body format: `CPU: 12.5%, Memory: 2048.00 MB`
pub fn format_usage(usage: &ResourceUsage) -> String {
    format!(
        "CPU: {:.1}%, Memory: {:.2} MB",
        usage.cpu_percent,
        usage.used_memory_mb()
    )
}

#[async_trait]
impl Handler for ResourcesHandler {
    async fn call(&self, _ctx: RequestContext) -> AppResult<Response> {
        let usage = self.probe.usage();
        Ok((StatusCode::OK, format_usage(&usage)).into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::FixedProbe;
    use axum::http::Method;

    #[test]
    fn test_format_usage() {
        let usage = ResourceUsage {
            cpu_percent: 12.5,
            used_memory_bytes: 2048 * 1024 * 1024,
        };
        assert_eq!(format_usage(&usage), "CPU: 12.5%, Memory: 2048.00 MB");

        let idle = ResourceUsage {
            cpu_percent: 0.0,
            used_memory_bytes: 1536 * 1024,
        };
        assert_eq!(format_usage(&idle), "CPU: 0.0%, Memory: 1.50 MB");
    }

    #[tokio::test]
    async fn test_handler_reports_probe_values() {
        let probe = FixedProbe(ResourceUsage {
            cpu_percent: 3.25,
            used_memory_bytes: 10 * 1024 * 1024,
        });
        let handler = ResourcesHandler::new(Arc::new(probe));

        let response = handler
            .call(RequestContext::new(Method::GET, "/resources"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = std::str::from_utf8(&body).unwrap();
        assert!(text.starts_with("CPU: 3."), "{text}");
        assert!(text.ends_with("Memory: 10.00 MB"), "{text}");
    }
}
