//! API route handlers
//!
//! - `health`: liveness against the set store, Prometheus metrics
//! - `uniqueness`: the global uniqueness check

pub mod health;
pub mod uniqueness;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info
///
/// Returns service information and the available endpoints.
/// This is the root endpoint (GET /) and requires no authentication.
///
/// # Response
///
/// ```json
/// {
///   "service": "Global Integrity Service",
///   "version": "0.1.0",
///   "description": "...",
///   "endpoints": { "health": "/health", "validate_uniqueness": "/validate-global-uniqueness" }
/// }
/// ```
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "service": "Global Integrity Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Provides global uniqueness checks for content fingerprints.",
        "endpoints": {
            "health": "/health",
            "metrics": "/metrics",
            "validate_uniqueness": "/validate-global-uniqueness"
        }
    })))
}

/// 404 Not Found handler
///
/// Returns a standardized error response for undefined routes.
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
