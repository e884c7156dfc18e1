//! HTTP request handlers for metered-demo
//!
//! Business handlers implement [`Handler`](crate::dispatch::Handler) and are
//! bound into a [`Dispatcher`] by [`routes`]. The scrape endpoint lives in
//! [`metrics`] as its own axum sub-router so it can be mounted independently
//! of the dispatcher.

use std::sync::Arc;

use axum::{
    Extension,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
};

use crate::config::Config;
use crate::dispatch::{Dispatcher, Instrumented, Match, RecordPolicy, RequestContext, Route};
use crate::error::{AppError, AppResult};
use crate::metrics::{
    LogSink, MetricsRegistry, RequestMetrics, TelemetrySink, register_process_collector,
};
use crate::middleware::RequestId;
use crate::system::{ResourceProbe, SystemProbe};
use tracing::Instrument;

pub mod health;
pub mod metrics;
pub mod resource;
pub mod resources;
pub mod root;
pub mod submit;

/// Application state shared across all handlers
///
/// All fields are Arc'd for cheap cloning across Axum handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    registry: Arc<MetricsRegistry>,
    dispatcher: Arc<Dispatcher>,
}

impl AppState {
    /// Create a new AppState backed by the host's resource probe
    ///
    /// # Errors
    ///
    /// Fails on an invalid config, a metric schema collision, or an invalid
    /// route table; all are startup configuration errors.
    pub fn new(config: Config) -> AppResult<Self> {
        Self::with_probe(config, Arc::new(SystemProbe::new()))
    }

    /// Create a new AppState with an explicit resource probe
    pub fn with_probe(config: Config, probe: Arc<dyn ResourceProbe>) -> AppResult<Self> {
        config.validate()?;

        let mut sinks: Vec<Arc<dyn TelemetrySink>> = Vec::new();
        if config.metrics.log_observations {
            sinks.push(Arc::new(LogSink));
        }

        let registry = Arc::new(MetricsRegistry::with_sinks(sinks));
        if config.metrics.process_metrics {
            register_process_collector(&registry)?;
        }

        let request_metrics = RequestMetrics::register(&registry, &config.metrics)?;
        let dispatcher = routes(&config, &request_metrics, probe)?;

        tracing::info!(
            routes = dispatcher.len(),
            include_health = config.instrumentation.include_health,
            record_rejected = config.instrumentation.record_rejected,
            "Application state initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            registry,
            dispatcher: Arc::new(dispatcher),
        })
    }

    /// Get reference to the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the metrics registry
    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }

    /// Get reference to the route table
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

/// Build the application route table
///
/// Every route except (optionally) `/health` is wrapped with request
/// instrumentation. The delete route reports the `/resource` endpoint label
/// so the resource id never becomes a label value.
pub fn routes(
    config: &Config,
    metrics: &RequestMetrics,
    probe: Arc<dyn ResourceProbe>,
) -> AppResult<Dispatcher> {
    let policy = RecordPolicy {
        record_rejected: config.instrumentation.record_rejected,
    };
    let instrument = |route: Route| Instrumented::wrap(route, metrics, policy);

    let mut dispatcher = Dispatcher::new();

    dispatcher.register(instrument(Route::new(
        Method::GET,
        "/",
        Arc::new(root::RootHandler),
    )?))?;

    let health = Route::new(Method::GET, "/health", Arc::new(health::HealthHandler))?;
    dispatcher.register(if config.instrumentation.include_health {
        instrument(health)
    } else {
        health
    })?;

    dispatcher.register(instrument(Route::new(
        Method::GET,
        "/resources",
        Arc::new(resources::ResourcesHandler::new(probe)),
    )?))?;

    dispatcher.register(instrument(Route::new(
        Method::POST,
        "/submit",
        Arc::new(submit::SubmitHandler::new(config.simulation.submit_delay())),
    )?))?;

    dispatcher.register(instrument(
        Route::new(
            Method::DELETE,
            "/resource/{id:int}",
            Arc::new(resource::DeleteResourceHandler::new(
                config.simulation.delete_delay(),
            )),
        )?
        .labeled("/resource"),
    ))?;

    Ok(dispatcher)
}

/// Catch-all axum handler feeding the dispatcher
///
/// Handler logs are emitted inside a span carrying the request id assigned
/// by the request-id middleware.
pub async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    request_id: Option<Extension<RequestId>>,
    body: Bytes,
) -> Response {
    let request_id = request_id.map(|Extension(id)| id).unwrap_or_default();
    let path = uri.path();
    let Some(Match { route, params }) = state.dispatcher().dispatch(&method, path) else {
        tracing::debug!(request_id = %request_id, method = %method, path, "No route matched");
        return AppError::NotFound.into_response();
    };

    let span = tracing::info_span!(
        "dispatch",
        request_id = %request_id,
        endpoint = %route.endpoint()
    );

    let ctx = RequestContext {
        method,
        path: path.to_string(),
        headers,
        body,
        params,
    };

    route
        .handler()
        .call(ctx)
        .instrument(span)
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

/// Uniform 404 for anything outside the route table
pub async fn not_found() -> Response {
    AppError::NotFound.into_response()
}
