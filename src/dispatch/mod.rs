//! Request dispatch
//!
//! Maps `(method, path)` to a registered handler. Matching is exact on the
//! method; literal routes are tried before parametrised ones, and within each
//! group the first registered route wins.

pub mod instrument;
pub mod pattern;

pub use instrument::{Instrumented, RecordPolicy};
pub use pattern::{CaptureKind, Param, Params, RoutePattern, Segment};

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use axum::response::Response;

use crate::error::{AppError, AppResult};

/// Per-request data handed to a handler
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub params: Params,
}

impl RequestContext {
    /// Build a context with no headers, body, or captured params
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            params: Params::default(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

/// Endpoint logic bound to a route
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, ctx: RequestContext) -> AppResult<Response>;
}

/// A registered (method, pattern) pair and its handler
pub struct Route {
    method: Method,
    pattern: RoutePattern,
    endpoint: String,
    handler: Arc<dyn Handler>,
}

impl Route {
    /// Create a route whose metrics endpoint label is the pattern text
    pub fn new(method: Method, pattern: &str, handler: Arc<dyn Handler>) -> AppResult<Self> {
        let pattern: RoutePattern = pattern.parse()?;
        Ok(Self {
            method,
            endpoint: pattern.as_str().to_string(),
            pattern,
            handler,
        })
    }

    /// Override the endpoint label reported in metrics
    pub fn labeled(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Replace the handler, e.g. to wrap it with instrumentation
    pub fn map_handler(mut self, f: impl FnOnce(Arc<dyn Handler>) -> Arc<dyn Handler>) -> Self {
        self.handler = f(self.handler);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    /// Route-template label used for metrics
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }
}

/// Successful dispatch result
pub struct Match<'a> {
    pub route: &'a Route,
    pub params: Params,
}

/// Route table
#[derive(Default)]
pub struct Dispatcher {
    literal: Vec<Route>,
    parametrised: Vec<Route>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route to the table
    ///
    /// # Errors
    ///
    /// `DuplicateRoute` if the same method and pattern text are already present.
    pub fn register(&mut self, route: Route) -> AppResult<()> {
        let duplicate = self
            .routes()
            .any(|r| r.method == route.method && r.pattern == route.pattern);
        if duplicate {
            return Err(AppError::DuplicateRoute {
                method: route.method.to_string(),
                pattern: route.pattern.to_string(),
            });
        }

        tracing::debug!(
            method = %route.method,
            pattern = %route.pattern,
            endpoint = %route.endpoint,
            "Registered route"
        );

        if route.pattern.is_literal() {
            self.literal.push(route);
        } else {
            self.parametrised.push(route);
        }
        Ok(())
    }

    /// Find the route for `method` and `path`
    ///
    /// Returns `None` for any unmatched combination; callers answer 404
    /// without distinguishing unknown paths from unknown methods.
    pub fn dispatch(&self, method: &Method, path: &str) -> Option<Match<'_>> {
        self.literal
            .iter()
            .chain(self.parametrised.iter())
            .filter(|route| route.method == *method)
            .find_map(|route| {
                route
                    .pattern
                    .matches(path)
                    .map(|params| Match { route, params })
            })
    }

    /// All routes in match order
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.literal.iter().chain(self.parametrised.iter())
    }

    pub fn len(&self) -> usize {
        self.literal.len() + self.parametrised.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
