use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use integrity::{UniquenessRequest, UniquenessResult, ValidationError};
use std::sync::Arc;
use std::time::Instant;

/// Check a batch of fingerprints against the global set and record the new ones.
///
/// The body is parsed by hand rather than through `Json<T>` so that a bad
/// member is reported with its index (`fingerprints[3]`) and a 422 status.
///
/// # Example
/// ```json
/// // Request
/// { "fingerprints": ["h1", "h4"] }
///
/// // Response
/// {
///   "total_fingerprints_received": 2,
///   "new_fingerprints_found": 1,
///   "duplicate_fingerprints_found": 1,
///   "global_uniqueness_score": 0.5
/// }
/// ```
///
/// Answers 503 with no counts when the store is unreachable; nothing is
/// written in that case.
pub async fn validate_global_uniqueness(
    State(state): State<Arc<ServerState>>,
    body: Result<Bytes, BytesRejection>,
) -> ServerResult<Json<UniquenessResult>> {
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServerError::PayloadTooLarge(state.config.max_body_size_mb)
        } else {
            ValidationError::new("body", rejection.body_text()).into()
        }
    })?;
    let request = UniquenessRequest::from_json(&body)?;
    request.validate(&state.config.batch_limits())?;

    let engine = state.engine()?;
    let start = Instant::now();
    let outcome = engine.evaluate(&request).await;
    metrics::histogram!("uniqueness_request_duration_ms")
        .record(start.elapsed().as_secs_f64() * 1000.0);

    match outcome {
        Ok(result) => {
            record_counts(&result);
            Ok(Json(result))
        }
        Err(err) => {
            let outcome = if err.is_store_failure() {
                "store_error"
            } else {
                "invalid"
            };
            metrics::counter!("uniqueness_requests_total", "outcome" => outcome).increment(1);
            Err(err.into())
        }
    }
}

fn record_counts(result: &UniquenessResult) {
    metrics::counter!("uniqueness_requests_total", "outcome" => "ok").increment(1);
    metrics::counter!("fingerprints_received_total")
        .increment(result.total_fingerprints_received as u64);
    metrics::counter!("fingerprints_new_total").increment(result.new_fingerprints_found as u64);
    metrics::counter!("fingerprints_duplicate_total")
        .increment(result.duplicate_fingerprints_found as u64);
}

