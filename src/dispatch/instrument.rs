//! Request instrumentation wrapper
//!
//! [`Instrumented`] times the wrapped handler and records one request-count
//! increment and one latency observation after it completes. The response is
//! returned only after recording, so latency covers handler execution but not
//! the transport flush.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::{Handler, RequestContext, Route};
use crate::error::AppResult;
use crate::metrics::RequestMetrics;

/// Which completed requests produce metric observations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordPolicy {
    /// Record 4xx responses (e.g. an unparseable `/submit` body)
    pub record_rejected: bool,
}

impl RecordPolicy {
    pub fn should_record(&self, status: StatusCode) -> bool {
        !status.is_client_error() || self.record_rejected
    }
}

/// Handler decorator recording request count and latency
pub struct Instrumented {
    inner: Arc<dyn Handler>,
    metrics: RequestMetrics,
    endpoint: String,
    policy: RecordPolicy,
}

impl Instrumented {
    /// Wrap `route`'s handler, labelling observations with its endpoint label
    pub fn wrap(route: Route, metrics: &RequestMetrics, policy: RecordPolicy) -> Route {
        let endpoint = route.endpoint().to_string();
        let metrics = metrics.clone();
        route.map_handler(move |inner| {
            Arc::new(Self {
                inner,
                metrics,
                endpoint,
                policy,
            }) as Arc<dyn Handler>
        })
    }
}

#[async_trait]
impl Handler for Instrumented {
    async fn call(&self, ctx: RequestContext) -> AppResult<Response> {
        let method = ctx.method.clone();
        let start = Instant::now();

        let response = self
            .inner
            .call(ctx)
            .await
            .unwrap_or_else(IntoResponse::into_response);

        let elapsed = start.elapsed();
        let status = response.status();

        if self.policy.should_record(status) {
            self.metrics.record(&method, &self.endpoint, status, elapsed);
        } else {
            tracing::debug!(
                method = %method,
                endpoint = %self.endpoint,
                status = status.as_u16(),
                "Skipping metrics for rejected request"
            );
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetricsConfig;
    use crate::error::AppError;
    use crate::metrics::MetricsRegistry;
    use crate::metrics::testing::sample;
    use axum::http::Method;
    use std::time::Duration;

    struct Sleepy(Duration);

    #[async_trait]
    impl Handler for Sleepy {
        async fn call(&self, _ctx: RequestContext) -> AppResult<Response> {
            tokio::time::sleep(self.0).await;
            Ok(StatusCode::CREATED.into_response())
        }
    }

    struct Rejecting;

    #[async_trait]
    impl Handler for Rejecting {
        async fn call(&self, _ctx: RequestContext) -> AppResult<Response> {
            let err = serde_json::from_slice::<serde_json::Value>(b"{").unwrap_err();
            Err(AppError::InvalidJson(err))
        }
    }

    fn setup() -> (MetricsRegistry, RequestMetrics) {
        let registry = MetricsRegistry::new();
        let config = MetricsConfig {
            namespace: "inst".to_string(),
            ..MetricsConfig::default()
        };
        let metrics = RequestMetrics::register(&registry, &config).unwrap();
        (registry, metrics)
    }

    #[tokio::test]
    async fn test_latency_covers_handler_execution() {
        let (registry, metrics) = setup();
        let route = Route::new(
            Method::POST,
            "/submit",
            Arc::new(Sleepy(Duration::from_millis(50))),
        )
        .unwrap();
        let route = Instrumented::wrap(route, &metrics, RecordPolicy::default());

        let response = route
            .handler()
            .call(RequestContext::new(Method::POST, "/submit"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let output = registry.render().unwrap();
        let labels = [("method", "POST"), ("endpoint", "/submit")];
        assert_eq!(
            sample(
                &output,
                "inst_request_count",
                &[labels[0], labels[1], ("http_status", "201")]
            ),
            Some(1.0)
        );
        let sum = sample(&output, "inst_request_latency_seconds_sum", &labels).unwrap();
        assert!(sum >= 0.05, "latency {sum} should include the handler sleep");
    }

    #[tokio::test]
    async fn test_rejected_requests_are_skipped_by_default() {
        let (registry, metrics) = setup();
        let route = Route::new(Method::POST, "/submit", Arc::new(Rejecting)).unwrap();
        let route = Instrumented::wrap(route, &metrics, RecordPolicy::default());

        let response = route
            .handler()
            .call(RequestContext::new(Method::POST, "/submit"))
            .await
            .expect("errors are converted into responses");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let output = registry.render().unwrap();
        assert!(!output.contains("endpoint=\"/submit\""));
    }

    #[tokio::test]
    async fn test_rejected_requests_recorded_when_enabled() {
        let (registry, metrics) = setup();
        let route = Route::new(Method::POST, "/submit", Arc::new(Rejecting)).unwrap();
        let route = Instrumented::wrap(
            route,
            &metrics,
            RecordPolicy {
                record_rejected: true,
            },
        );

        route
            .handler()
            .call(RequestContext::new(Method::POST, "/submit"))
            .await
            .unwrap();

        let output = registry.render().unwrap();
        assert_eq!(
            sample(
                &output,
                "inst_request_count",
                &[("endpoint", "/submit"), ("http_status", "400")]
            ),
            Some(1.0)
        );
    }

    #[tokio::test]
    async fn test_label_override_is_used() {
        let (registry, metrics) = setup();
        let route = Route::new(
            Method::DELETE,
            "/resource/{id:int}",
            Arc::new(Sleepy(Duration::ZERO)),
        )
        .unwrap()
        .labeled("/resource");
        let route = Instrumented::wrap(route, &metrics, RecordPolicy::default());

        route
            .handler()
            .call(RequestContext::new(Method::DELETE, "/resource/42"))
            .await
            .unwrap();

        let output = registry.render().unwrap();
        assert!(output.contains("endpoint=\"/resource\""));
        assert!(!output.contains("/resource/42"));
        assert!(!output.contains("{id:int}"));
    }

    #[test]
    fn test_policy() {
        let skip = RecordPolicy::default();
        assert!(skip.should_record(StatusCode::OK));
        assert!(skip.should_record(StatusCode::NO_CONTENT));
        assert!(!skip.should_record(StatusCode::BAD_REQUEST));
        assert!(skip.should_record(StatusCode::INTERNAL_SERVER_ERROR));

        let keep = RecordPolicy {
            record_rejected: true,
        };
        assert!(keep.should_record(StatusCode::BAD_REQUEST));
    }
}
