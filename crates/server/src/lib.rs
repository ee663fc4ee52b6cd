//! Global Integrity Server - HTTP REST API for global fingerprint uniqueness
//!
//! This crate exposes the uniqueness engine over HTTP. Callers submit a batch
//! of content fingerprints; the server reports how many are new versus
//! already seen by any caller, records the new ones in the shared set store,
//! and returns a uniqueness score.
//!
//! # Features
//!
//! - **Authentication**: API key in the `X-API-KEY` header
//! - **Backends**: direct Redis or a REST command proxy, picked by config
//! - **Degraded mode**: an unreachable store at startup is reported by
//!   `/health` instead of crashing the process
//! - **Observability**: structured JSON logs, request IDs, Prometheus metrics
//! - **Graceful Shutdown**: SIGTERM / Ctrl+C handling
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! ## Public Endpoints (No Authentication)
//!
//! - `GET /` - Service information
//! - `GET /health` - Store liveness (`503` when unreachable)
//! - `GET /metrics` - Prometheus metrics
//!
//! ## Protected Endpoints (API Key Required)
//!
//! - `POST /validate-global-uniqueness` - Check and record a fingerprint batch

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
