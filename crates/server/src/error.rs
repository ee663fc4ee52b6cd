use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use integrity::{IntegrityError, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use store::StoreError;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Payload too large: max {0}MB allowed")]
    PayloadTooLarge(usize),

    #[error("Store service is unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ServerError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Internal(_) | ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::Authentication(_) => "AUTH_FAILED",
            ServerError::Validation(_) => "VALIDATION_ERROR",
            ServerError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ServerError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::Config(_) => "CONFIG_ERROR",
            ServerError::NotFound => "NOT_FOUND",
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ServerError::Validation(err) => Some(json!({ "field": err.field })),
            _ => None,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(status = %status, error = %self, "request failed");
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<IntegrityError> for ServerError {
    fn from(err: IntegrityError) -> Self {
        match err {
            IntegrityError::Validation(err) => ServerError::Validation(err),
            // A malformed store reply is as fatal for this call as an
            // unreachable store.
            IntegrityError::StoreUnavailable(err) | IntegrityError::BackendProtocol(err) => {
                ServerError::StoreUnavailable(err.to_string())
            }
        }
    }
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        ServerError::StoreUnavailable(err.to_string())
    }
}

impl From<std::net::AddrParseError> for ServerError {
    fn from(err: std::net::AddrParseError) -> Self {
        ServerError::Config(format!("Invalid address: {err}"))
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(format!("IO error: {err}"))
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}
