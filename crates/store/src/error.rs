use std::time::Duration;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by [`SetStore`](crate::SetStore) implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The backend could not be reached or dropped the connection.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// A single round trip exceeded the configured timeout.
    #[error("store round trip timed out after {0:?}")]
    Timeout(Duration),
    /// The backend answered with something we do not understand.
    #[error("unexpected store response: {0}")]
    Protocol(String),
    /// The backend configuration is unusable (bad URL, missing token, ...).
    #[error("invalid store config: {0}")]
    InvalidConfig(String),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        StoreError::Unavailable(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        StoreError::Protocol(msg.into())
    }

    /// True when the failure means the store could not be reached at all,
    /// as opposed to a malformed answer.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout(_))
    }
}

/// Bound a store future by `limit`, mapping elapsed deadlines to [`StoreError::Timeout`].
pub(crate) async fn with_timeout<T, F>(limit: Duration, fut: F) -> StoreResult<T>
where
    F: std::future::Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}
