//! # Fingerprint Store
//!
//! Backend-agnostic client for the set store that holds every fingerprint the
//! service has ever recorded. Callers talk to the [`SetStore`] trait; the
//! concrete backend is chosen at runtime through [`BackendConfig`]:
//!
//! - [`RedisSetStore`]: direct protocol client over a shared connection
//!   manager. Membership and insert are one round trip per batch.
//! - [`RestSetStore`]: HTTP proxy speaking one command per request. Insert is
//!   one round trip, membership is one round trip **per member**.
//! - [`InMemorySetStore`]: process-local set for tests and local runs.
//!
//! Failures never degrade into guesses: a membership check either answers for
//! every member or returns a [`StoreError`].
//!
//! ## Example Usage
//!
//! ```
//! use store::{BackendConfig, SetStore};
//!
//! # tokio_test_block_on(async {
//! let store = BackendConfig::in_memory().connect().await.unwrap();
//! let batch = vec!["a1f3".to_string(), "9c0e".to_string()];
//!
//! assert_eq!(store.check_membership("global_fingerprints", &batch).await.unwrap(), vec![false, false]);
//! store.add_members("global_fingerprints", &batch).await.unwrap();
//! assert_eq!(store.check_membership("global_fingerprints", &batch).await.unwrap(), vec![true, true]);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

mod backend;
mod error;

pub use backend::{BackendConfig, InMemorySetStore, RedisConfig, RestConfig, SetStore};
#[cfg(feature = "backend-redis")]
pub use backend::RedisSetStore;
#[cfg(feature = "backend-rest")]
pub use backend::RestSetStore;
pub use error::{StoreError, StoreResult};
