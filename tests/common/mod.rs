//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
};
use metered_demo::{
    config::Config,
    handlers::AppState,
    server,
    system::{FixedProbe, ResourceUsage},
};
use tower::ServiceExt; // for `oneshot`

/// Defaults with no simulated delays and no process collector
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.simulation.submit_delay_ms = 0;
    config.simulation.delete_delay_ms = 0;
    config.metrics.process_metrics = false;
    config
}

/// Build the full application with a deterministic resource probe
pub fn test_app(config: Config) -> Router {
    let probe = FixedProbe(ResourceUsage {
        cpu_percent: 12.5,
        used_memory_bytes: 256 * 1024 * 1024,
    });
    let state = AppState::with_probe(config, Arc::new(probe)).expect("should create AppState");
    server::app(state)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("body should be UTF-8")
    }
}

pub async fn send(app: &Router, method: Method, uri: &str, body: impl Into<Body>) -> TestResponse {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn get(app: &Router, uri: &str) -> TestResponse {
    send(app, Method::GET, uri, Body::empty()).await
}

/// Fetch the scrape endpoint and return its body
pub async fn scrape(app: &Router, path: &str) -> String {
    let response = get(app, path).await;
    assert_eq!(response.status, StatusCode::OK, "scrape of {path} failed");
    response.text()
}

/// Value of the first sample line for `series` carrying all `labels`
///
/// Label order in the exposition output is not significant, so lines are
/// matched by label containment.
pub fn sample(output: &str, series: &str, labels: &[(&str, &str)]) -> Option<f64> {
    let with_labels = format!("{}{{", series);
    let bare = format!("{} ", series);
    output
        .lines()
        .filter(|line| line.starts_with(&with_labels) || line.starts_with(&bare))
        .find(|line| {
            labels
                .iter()
                .all(|(k, v)| line.contains(&format!("{}=\"{}\"", k, v)))
        })
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|value| value.parse().ok())
}
