//! Global fingerprint uniqueness.
//!
//! This crate decides, for a batch of content fingerprints, which ones have
//! never been seen by any caller of the shared backend, records those in the
//! global set, and scores the batch. Storage goes through the
//! [`store::SetStore`] trait so the same engine runs over a direct Redis
//! connection, a REST proxy, or an in-memory set.
//!
//! ```
//! use integrity::{UniquenessEngine, UniquenessRequest};
//! use std::sync::Arc;
//! use store::InMemorySetStore;
//!
//! # tokio_block_on(async {
//! let engine = UniquenessEngine::with_store(Arc::new(InMemorySetStore::new()));
//!
//! let first = engine.evaluate(&UniquenessRequest::new(["h1", "h2", "h3"])).await.unwrap();
//! assert_eq!(first.new_fingerprints_found, 3);
//!
//! let second = engine.evaluate(&UniquenessRequest::new(["h1", "h4"])).await.unwrap();
//! assert_eq!(second.duplicate_fingerprints_found, 1);
//! assert_eq!(second.global_uniqueness_score, 0.5);
//! # });
//! # fn tokio_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

pub mod engine;
pub mod types;

pub use engine::{EngineConfig, GLOBAL_FINGERPRINT_SET, UniquenessEngine};
pub use store::{BackendConfig, SetStore, StoreError};
pub use types::{
    BatchLimits, DEFAULT_MAX_BATCH_SIZE, Fingerprint, UniquenessRequest, UniquenessResult,
    ValidationError,
};

use thiserror::Error;

/// Errors that abort a uniqueness check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    /// The request failed shape or limit checks.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    /// The store could not be reached, or a round trip timed out.
    #[error("store unavailable: {0}")]
    StoreUnavailable(StoreError),
    /// The store answered, but not in a shape we understand.
    #[error("store protocol error: {0}")]
    BackendProtocol(StoreError),
}

impl IntegrityError {
    /// True for failures caused by the backing store rather than the caller.
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            IntegrityError::StoreUnavailable(_) | IntegrityError::BackendProtocol(_)
        )
    }
}

impl From<StoreError> for IntegrityError {
    fn from(err: StoreError) -> Self {
        if err.is_unavailable() {
            IntegrityError::StoreUnavailable(err)
        } else {
            IntegrityError::BackendProtocol(err)
        }
    }
}
