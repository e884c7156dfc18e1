//! Prometheus metrics endpoint
//!
//! Exposes the registry in Prometheus text format for scraping. Mounted as a
//! standalone sub-router at `metrics.path`; requests to it are never recorded
//! in the request metrics.

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};

use crate::metrics::MetricsRegistry;

/// Metrics handler for Prometheus scraping
///
/// # Response
///
/// - `200 OK` with metrics in Prometheus text format
/// - `500 Internal Server Error` if metrics encoding fails
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/metrics
/// # HELP metered_demo_request_count Application Request Count
/// # TYPE metered_demo_request_count counter
/// metered_demo_request_count{endpoint="/",http_status="200",method="GET"} 3
/// ```
pub async fn handler(State(registry): State<Arc<MetricsRegistry>>) -> Response {
    match registry.render() {
        Ok(output) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, registry.content_type())],
            output,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render metrics for Prometheus scraping");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to gather metrics: {}", e),
            )
                .into_response()
        }
    }
}

/// Sub-router serving `GET <path>`; other methods on the path get the
/// application's plain 404.
pub fn router<S>(path: &str, registry: Arc<MetricsRegistry>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route(path, get(handler).fallback(super::not_found))
        .with_state(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::testing::sample;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_metrics_handler_returns_prometheus_format() {
        let registry = Arc::new(MetricsRegistry::new());
        let counter = registry
            .register_counter("demo_hits", "Hits", &["endpoint"])
            .unwrap();
        counter.increment(&["/"]).unwrap();

        let response = handler(State(Arc::clone(&registry))).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            prometheus::TEXT_FORMAT
        );
        let body = body_text(response).await;
        assert!(body.contains("# HELP demo_hits Hits"));
        assert!(body.contains("# TYPE demo_hits counter"));
        assert_eq!(sample(&body, "demo_hits", &[("endpoint", "/")]), Some(1.0));
    }

    #[tokio::test]
    async fn test_metrics_handler_with_empty_registry() {
        let response = handler(State(Arc::new(MetricsRegistry::new()))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_router_serves_custom_path_only() {
        let registry = Arc::new(MetricsRegistry::new());
        let app: Router = router("/internal/metrics", registry);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/internal/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/internal/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_concurrent_metrics_scraping() {
        let registry = Arc::new(MetricsRegistry::new());
        let counter = registry
            .register_counter("demo_hits", "Hits", &["endpoint"])
            .unwrap();
        for _ in 0..100 {
            counter.increment(&["/"]).unwrap();
        }

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { body_text(handler(State(registry)).await).await })
            })
            .collect();

        let bodies: Vec<String> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        for body in &bodies {
            assert_eq!(body, &bodies[0], "scrapes of a quiet registry must agree");
            assert_eq!(sample(body, "demo_hits", &[("endpoint", "/")]), Some(100.0));
        }
    }
}
