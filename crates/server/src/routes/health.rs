use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body of a successful health check.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub redis_connected: bool,
}

/// Health check endpoint
///
/// Pings the set store on every call. Answers 503 when the process started
/// degraded or the store stopped answering.
pub async fn health_check(
    State(state): State<Arc<ServerState>>,
) -> ServerResult<Json<HealthResponse>> {
    let store = state
        .store()
        .ok_or_else(|| ServerError::StoreUnavailable("no store connection".to_string()))?;

    store.ping().await?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        redis_connected: true,
    }))
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    let handle = state.metrics().ok_or(ServerError::NotFound)?;
    Ok((
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}
