use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use integrity::UniquenessEngine;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use store::SetStore;
use subtle::ConstantTimeEq;

/// Shared application state
///
/// The store handle is created once at startup and shared by every request.
/// When the store could not be reached at startup the state is *degraded*:
/// it carries no engine, and every store-backed route answers 503.
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Uniqueness engine, absent while degraded
    engine: Option<UniquenessEngine>,

    /// Prometheus recorder handle, when metrics are enabled
    metrics: Option<PrometheusHandle>,
}

impl ServerState {
    /// Build the configured store, ping it, and wrap it in an engine.
    ///
    /// Never fails: an unreachable store is logged and yields a degraded state.
    pub async fn connect(config: ServerConfig) -> Self {
        let backend = config.store.name();
        let store = match config.store.connect().await {
            Ok(store) => store,
            Err(err) => {
                tracing::error!(backend, error = %err, "could not connect to the set store");
                return Self::degraded(config);
            }
        };

        match store.ping().await {
            Ok(()) => {
                tracing::info!(backend, "connected to the set store");
                Self::with_store(config, store)
            }
            Err(err) => {
                tracing::error!(backend, error = %err, "set store did not answer PING");
                Self::degraded(config)
            }
        }
    }

    /// State over an already-built store.
    pub fn with_store(config: ServerConfig, store: Arc<dyn SetStore>) -> Self {
        let engine = UniquenessEngine::new(store, config.engine_config());
        Self {
            config: Arc::new(config),
            engine: Some(engine),
            metrics: None,
        }
    }

    /// State without a store.
    pub fn degraded(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
            engine: None,
            metrics: None,
        }
    }

    /// Attach the Prometheus handle rendered by `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn metrics(&self) -> Option<&PrometheusHandle> {
        self.metrics.as_ref()
    }

    pub fn is_degraded(&self) -> bool {
        self.engine.is_none()
    }

    /// The engine, or 503 when the store is unavailable.
    pub fn engine(&self) -> ServerResult<&UniquenessEngine> {
        self.engine
            .as_ref()
            .ok_or_else(|| ServerError::StoreUnavailable("no store connection".to_string()))
    }

    pub fn store(&self) -> Option<&Arc<dyn SetStore>> {
        self.engine.as_ref().map(UniquenessEngine::store)
    }

    /// Check if API key is valid
    pub fn is_valid_api_key(&self, key: &str) -> bool {
        // Compare against every key so timing does not reveal which one matched.
        self.config
            .api_keys
            .iter()
            .fold(false, |found, candidate| {
                found | bool::from(candidate.as_bytes().ct_eq(key.as_bytes()))
            })
    }
}
