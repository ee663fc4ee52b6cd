//! Server initialization and routing
//!
//! This module handles the Axum server setup including:
//! - Router configuration with all API endpoints
//! - Middleware stack (auth, logging, request IDs, timeouts)
//! - Store lifecycle and graceful shutdown

use crate::config::ServerConfig;
use crate::middleware::{api_key_auth, log_requests, request_id};
use crate::routes::{api_info, not_found};
use crate::routes::{health, uniqueness};
use crate::state::ServerState;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the Axum router with all routes and middleware
///
/// Routes are divided into:
/// - Public routes: /, /health, /metrics (no auth required)
/// - Protected routes: /validate-global-uniqueness (API key required)
///
/// Global middleware, outermost first: request ID, request logging, tracing,
/// CORS, compression, timeout.
pub fn build_router(state: Arc<ServerState>) -> Router {
    let cors = if state.config.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/", get(api_info))
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics));

    // Protected routes (require API key)
    let protected_routes = Router::new()
        .route(
            "/validate-global-uniqueness",
            post(uniqueness::validate_global_uniqueness),
        )
        .layer(DefaultBodyLimit::max(state.config.max_body_size()))
        .layer(from_fn_with_state(state.clone(), api_key_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(request_id))
                .layer(from_fn(log_requests))
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    state.config.timeout(),
                )),
        )
        .with_state(state)
}

/// Start the HTTP server
///
/// Initializes logging and metrics, connects to the configured set store,
/// and serves until SIGTERM or Ctrl+C.
///
/// An unreachable store does not stop startup: the server runs degraded and
/// answers 503 on `/health` and `/validate-global-uniqueness` so that an
/// orchestrator can restart it.
///
/// # Example
///
/// ```rust,no_run
/// use server::ServerConfig;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = ServerConfig::load()?;
///     server::start_server(config).await?;
///     Ok(())
/// }
/// ```
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .json()
        .init();

    let addr: SocketAddr = config.socket_addr()?;

    let metrics = if config.metrics_enabled {
        Some(PrometheusBuilder::new().install_recorder()?)
    } else {
        None
    };

    let mut state = ServerState::connect(config.clone()).await;
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }
    let state = Arc::new(state);

    let app = build_router(state.clone());

    tracing::info!(
        "Starting Global Integrity server on {} with {} API keys",
        addr,
        config.api_keys.len()
    );
    tracing::info!(
        backend = config.store.name(),
        set_key = %config.set_key,
        degraded = state.is_degraded(),
        "Store configured"
    );
    tracing::info!(
        "Timeout: {}s, Max body: {}MB, Max batch: {}",
        config.timeout_secs,
        config.max_body_size_mb,
        config.max_batch_size
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(store) = state.store() {
        if let Err(err) = store.close().await {
            tracing::warn!(error = %err, "store did not close cleanly");
        }
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
