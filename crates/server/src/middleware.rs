use crate::error::ServerError;
use crate::state::ServerState;
use axum::extract::Request;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;
use tracing::Instrument;

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// API Key authentication middleware
pub async fn api_key_auth(
    state: axum::extract::State<Arc<ServerState>>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    // Extract API key from header
    let api_key = request
        .headers()
        .get(API_KEY_HEADER)
        .or_else(|| request.headers().get(AUTHORIZATION))
        .and_then(|v| v.to_str().ok())
        .map(|s| {
            // Handle "Bearer <token>" format
            s.strip_prefix("Bearer ").unwrap_or(s).to_string()
        });

    match api_key {
        Some(key) if state.is_valid_api_key(&key) => Ok(next.run(request).await),
        Some(_) => Err(ServerError::Authentication(
            "Invalid or missing API Key".to_string(),
        )),
        None => Err(ServerError::Authentication(
            "API key required. Provide it in the 'X-API-KEY' header".to_string(),
        )),
    }
}

/// Request ID injection middleware
///
/// Everything downstream runs inside a `request` span carrying the ID, so
/// engine and store events are tagged with it too.
pub async fn request_id(mut request: Request, next: Next) -> Response {
    // Generate or extract request ID
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    // Add to request extensions for handlers to access
    request.extensions_mut().insert(request_id.clone());

    let span = tracing::info_span!("request", request_id = %request_id);
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }

    response
}

/// Logging middleware
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let request_id = request
        .extensions()
        .get::<String>()
        .cloned()
        .unwrap_or_default();

    let response = next.run(request).await;
    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %status,
        duration_ms = %duration.as_millis(),
        request_id = %request_id,
        "Request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::get;
    use axum::Router;
    use std::sync::Mutex;
    use tower::ServiceExt;
    use tracing::field::{Field, Visit};
    use tracing::span::{Attributes, Id};
    use tracing::Subscriber;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    type Recorded = Arc<Mutex<Vec<(String, String, String)>>>;

    /// Records `(span, field, value)` for every span opened.
    struct SpanFields(Recorded);

    struct FieldVisitor<'a> {
        span: &'static str,
        out: &'a mut Vec<(String, String, String)>,
    }

    impl Visit for FieldVisitor<'_> {
        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            self.out.push((
                self.span.to_string(),
                field.name().to_string(),
                format!("{value:?}"),
            ));
        }
    }

    impl<S: Subscriber> Layer<S> for SpanFields {
        fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
            let mut out = self.0.lock().unwrap();
            attrs.record(&mut FieldVisitor {
                span: attrs.metadata().name(),
                out: &mut *out,
            });
        }
    }

    #[tokio::test]
    async fn request_id_is_a_span_field_and_echoed() {
        let recorded = Recorded::default();
        let subscriber = tracing_subscriber::registry().with(SpanFields(recorded.clone()));
        let _default = tracing::subscriber::set_default(subscriber);

        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn(request_id));
        let request = axum::http::Request::get("/")
            .header("x-request-id", "req-42")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "req-42");

        let recorded = recorded.lock().unwrap();
        assert!(
            recorded.contains(&(
                "request".to_string(),
                "request_id".to_string(),
                "req-42".to_string()
            )),
            "spans: {recorded:?}"
        );
    }
}
