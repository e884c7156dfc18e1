//! HTTP server assembly and lifecycle

use std::future::Future;
use std::net::SocketAddr;

use axum::{Router, extract::DefaultBodyLimit, middleware};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::handlers::{self, AppState};
use crate::middleware::request_id_middleware;

/// Build the complete application
///
/// The scrape endpoint is merged as its own sub-router; everything else falls
/// through to the dispatcher.
pub fn app(state: AppState) -> Router {
    let config = state.config();
    let scrape = handlers::metrics::router(&config.metrics.path, state.registry().clone());

    Router::new()
        .merge(scrape)
        .fallback(handlers::dispatch)
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            request_id_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolve the configured bind address
///
/// An unparseable host falls back to all interfaces.
pub fn bind_addr(config: &Config) -> SocketAddr {
    let ip = config
        .server
        .host
        .parse::<std::net::IpAddr>()
        .unwrap_or_else(|_| {
            tracing::warn!(
                host = %config.server.host,
                "Invalid server.host, binding to 0.0.0.0"
            );
            std::net::IpAddr::from([0, 0, 0, 0])
        });
    SocketAddr::from((ip, config.server.port))
}

/// Build state from `config`, bind, and serve until Ctrl-C or SIGTERM
pub async fn serve(config: Config) -> AppResult<()> {
    let addr = bind_addr(&config);
    let state = AppState::new(config)?;

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        tracing::error!(error = %e, address = %addr, "Failed to bind");
        AppError::Internal(format!("failed to bind {}: {}", addr, e))
    })?;

    run(listener, state, shutdown_signal()).await
}

/// Serve `state` on an already bound listener until `shutdown` resolves
pub async fn run<F>(listener: TcpListener, state: AppState, shutdown: F) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local = listener
        .local_addr()
        .map_err(|e| AppError::Internal(format!("listener has no local address: {}", e)))?;

    tracing::info!("Listening on {}", local);
    tracing::info!(
        "Metrics available at http://{}{}",
        local,
        state.config().metrics.path
    );

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| AppError::Internal(format!("server error: {}", e)))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Received shutdown signal, initiating graceful shutdown");
}
