use crate::{StoreError, StoreResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// Set-membership and set-insert primitives over a named set.
///
/// Implementations hide the transport: the engine only ever sees this trait.
/// Every method either answers for the whole input or fails as a whole;
/// a member whose membership could not be determined is never reported as
/// absent.
#[async_trait]
pub trait SetStore: Send + Sync {
    /// Return, for each member in order, whether it is in the set under `key`.
    async fn check_membership(&self, key: &str, members: &[String]) -> StoreResult<Vec<bool>>;
    /// Add all `members` to the set under `key`. Empty input is a no-op.
    async fn add_members(&self, key: &str, members: &[String]) -> StoreResult<()>;
    /// Liveness check against the backend.
    async fn ping(&self) -> StoreResult<()>;
    /// Release backend resources at shutdown.
    async fn close(&self) -> StoreResult<()> {
        Ok(())
    }
    /// Short label used in logs and metrics.
    fn backend_name(&self) -> &'static str;
}

/// Configuration for selecting and building a backend.
///
/// ```
/// use store::{BackendConfig, RedisConfig};
///
/// // In-memory (for testing)
/// let config = BackendConfig::in_memory();
///
/// // Direct Redis connection
/// let config = BackendConfig::Redis(RedisConfig::default());
/// assert_eq!(config.name(), "redis");
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Native protocol connection with batched membership checks.
    Redis(RedisConfig),
    /// Command-per-request REST proxy in front of the same store.
    Rest(RestConfig),
    /// Process-local set, useful for tests and local development.
    InMemory,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Redis(RedisConfig::default())
    }
}

impl BackendConfig {
    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    pub fn name(&self) -> &'static str {
        match self {
            BackendConfig::Redis(_) => "redis",
            BackendConfig::Rest(_) => "rest",
            BackendConfig::InMemory => "in_memory",
        }
    }

    /// Build the backend described by this configuration.
    ///
    /// The Redis variant opens its connection manager here, so an unreachable
    /// server fails this call. The REST variant keeps no persistent
    /// connection and only validates its URL.
    pub async fn connect(&self) -> StoreResult<Arc<dyn SetStore>> {
        match self {
            BackendConfig::InMemory => Ok(Arc::new(InMemorySetStore::new())),
            BackendConfig::Redis(cfg) => {
                #[cfg(feature = "backend-redis")]
                {
                    Ok(Arc::new(RedisSetStore::connect(cfg).await?))
                }
                #[cfg(not(feature = "backend-redis"))]
                {
                    let _ = cfg;
                    Err(StoreError::InvalidConfig(
                        "redis backend disabled at compile time".into(),
                    ))
                }
            }
            BackendConfig::Rest(cfg) => {
                #[cfg(feature = "backend-rest")]
                {
                    Ok(Arc::new(RestSetStore::new(cfg)?))
                }
                #[cfg(not(feature = "backend-rest"))]
                {
                    let _ = cfg;
                    Err(StoreError::InvalidConfig(
                        "rest backend disabled at compile time".into(),
                    ))
                }
            }
        }
    }
}

/// Connection settings for the direct Redis backend.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct RedisConfig {
    #[serde(default = "default_redis_host")]
    pub host: String,
    #[serde(default = "default_redis_port")]
    pub port: u16,
    #[serde(default)]
    pub db: i64,
    /// Per-command (and connect) timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: default_redis_host(),
            port: default_redis_port(),
            db: 0,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl RedisConfig {
    pub fn url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db)
    }
}

/// Settings for the REST proxy backend.
#[derive(Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RestConfig {
    /// Base URL of the proxy, e.g. `https://eu1-xyz.upstash.io`.
    pub url: String,
    /// Bearer token sent with every command.
    pub token: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Upper bound on concurrent per-member membership requests.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

impl RestConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            timeout_ms: default_timeout_ms(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

// Hand-written so the token never ends up in logs.
impl std::fmt::Debug for RestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("timeout_ms", &self.timeout_ms)
            .field("max_in_flight", &self.max_in_flight)
            .finish()
    }
}

fn default_redis_host() -> String {
    "localhost".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_max_in_flight() -> usize {
    16
}

/// An in-memory backend using a `RwLock` around a map of sets.
pub struct InMemorySetStore {
    sets: RwLock<HashMap<String, HashSet<String>>>,
}

impl InMemorySetStore {
    pub fn new() -> Self {
        Self {
            sets: RwLock::new(HashMap::new()),
        }
    }

    /// Number of members currently stored under `key`.
    pub fn cardinality(&self, key: &str) -> StoreResult<usize> {
        let guard = self
            .sets
            .read()
            .map_err(|_| StoreError::unavailable("poisoned lock"))?;
        Ok(guard.get(key).map_or(0, HashSet::len))
    }
}

impl Default for InMemorySetStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SetStore for InMemorySetStore {
    async fn check_membership(&self, key: &str, members: &[String]) -> StoreResult<Vec<bool>> {
        let guard = self
            .sets
            .read()
            .map_err(|_| StoreError::unavailable("poisoned lock"))?;
        let flags = match guard.get(key) {
            Some(set) => members.iter().map(|m| set.contains(m)).collect(),
            None => vec![false; members.len()],
        };
        Ok(flags)
    }

    async fn add_members(&self, key: &str, members: &[String]) -> StoreResult<()> {
        if members.is_empty() {
            return Ok(());
        }
        // A single write lock is held for the entire batch insert.
        let mut guard = self
            .sets
            .write()
            .map_err(|_| StoreError::unavailable("poisoned lock"))?;
        guard
            .entry(key.to_string())
            .or_default()
            .extend(members.iter().cloned());
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "in_memory"
    }
}

/// Direct Redis backend over a shared connection manager.
#[cfg(feature = "backend-redis")]
pub mod redis;

#[cfg(feature = "backend-redis")]
pub use self::redis::RedisSetStore;

/// REST proxy backend speaking one command per HTTP request.
#[cfg(feature = "backend-rest")]
pub mod rest;

#[cfg(feature = "backend-rest")]
pub use self::rest::RestSetStore;
