use integrity::{BatchLimits, EngineConfig, DEFAULT_MAX_BATCH_SIZE, GLOBAL_FINGERPRINT_SET};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;
use store::BackendConfig;

/// Environment variable prefix, e.g. `INTEGRITY__PORT=8000`.
pub const ENV_PREFIX: &str = "INTEGRITY";

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Maximum fingerprints per request (0 = unbounded)
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// API keys accepted in `X-API-KEY`
    #[serde(default)]
    pub api_keys: HashSet<String>,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Metrics endpoint enabled
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Store key of the global fingerprint set
    #[serde(default = "default_set_key")]
    pub set_key: String,

    /// Set store backend
    #[serde(default)]
    pub store: BackendConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            max_batch_size: default_max_batch_size(),
            api_keys: HashSet::new(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
            set_key: default_set_key(),
            store: BackendConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `.env`, an optional `server` config file and
    /// `INTEGRITY__*` environment variables, in increasing precedence.
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }

        let builder = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::with_name("server").required(false))
            // Override with environment variables
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("api_keys"),
            );

        let config: ServerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the server cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_keys.is_empty() {
            anyhow::bail!("no API keys configured; set {ENV_PREFIX}__API_KEYS");
        }
        if self.api_keys.iter().any(|k| k.trim().is_empty()) {
            anyhow::bail!("API keys must not be blank");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be positive");
        }
        Ok(())
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }

    pub fn batch_limits(&self) -> BatchLimits {
        BatchLimits {
            max_batch_size: self.max_batch_size,
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            set_key: self.set_key.clone(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_body_size_mb() -> usize {
    10
}

fn default_max_batch_size() -> usize {
    DEFAULT_MAX_BATCH_SIZE
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_set_key() -> String {
    GLOBAL_FINGERPRINT_SET.to_string()
}
