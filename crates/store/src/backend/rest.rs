//! REST proxy backend (Upstash-style) for the global fingerprint set.
//!
//! Every command is one `POST {base_url}` whose body is the command as a
//! JSON array, e.g. `["SADD", "global_fingerprints", "h1", "h2"]`. The proxy
//! answers `{"result": ...}` on success or `{"error": "..."}` on failure.
//!
//! The proxy has no multi-member membership command, so a membership check
//! costs one `SISMEMBER` request per member. Requests run with at most
//! `max_in_flight` outstanding, but the round-trip count stays O(N). Inserts
//! carry the whole batch in a single `SADD`.
//!
//! # Configuration Example
//! ```yaml
//! store:
//!   backend: "rest"
//!   url: "https://eu1-example.upstash.io"
//!   token: "${UPSTASH_REDIS_REST_TOKEN}"
//! ```

use crate::error::with_timeout;
use crate::{RestConfig, SetStore, StoreError, StoreResult};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Reply envelope returned by the proxy for every command.
#[derive(Debug, Deserialize)]
struct CommandReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

pub struct RestSetStore {
    client: Client,
    base_url: Url,
    token: String,
    timeout: Duration,
    max_in_flight: usize,
}

impl RestSetStore {
    pub fn new(cfg: &RestConfig) -> StoreResult<Self> {
        let base_url = Url::parse(cfg.url.trim_end_matches('/'))
            .map_err(|e| StoreError::InvalidConfig(format!("rest url {:?}: {e}", cfg.url)))?;
        if cfg.token.is_empty() {
            return Err(StoreError::InvalidConfig("rest token is empty".into()));
        }

        let timeout = Duration::from_millis(cfg.timeout_ms);
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| StoreError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            token: cfg.token.clone(),
            timeout,
            max_in_flight: cfg.max_in_flight.max(1),
        })
    }

    /// Send one command and return its `result` value.
    async fn execute(&self, command: &[&str]) -> StoreResult<Value> {
        let name = command.first().copied().unwrap_or_default();
        let send = async {
            let response = self
                .client
                .post(self.base_url.clone())
                .bearer_auth(&self.token)
                .json(command)
                .send()
                .await
                .map_err(map_transport_error)?;

            let status = response.status();
            if status.is_server_error() {
                return Err(StoreError::unavailable(format!("{name} answered {status}")));
            }

            let body = response.text().await.map_err(map_transport_error)?;
            parse_reply(name, status, &body)
        };

        with_timeout(self.timeout, send)
            .await
            .inspect_err(|err| tracing::warn!(command = name, error = %err, "rest command failed"))
    }

    async fn is_member(&self, key: &str, member: &str) -> StoreResult<bool> {
        match self.execute(&["SISMEMBER", key, member]).await? {
            Value::Number(n) => match n.as_i64() {
                Some(0) => Ok(false),
                Some(1) => Ok(true),
                _ => Err(StoreError::protocol(format!("SISMEMBER returned {n}"))),
            },
            other => Err(StoreError::protocol(format!(
                "SISMEMBER returned non-integer {other}"
            ))),
        }
    }
}

#[async_trait]
impl SetStore for RestSetStore {
    async fn check_membership(&self, key: &str, members: &[String]) -> StoreResult<Vec<bool>> {
        // Futures are built up front so the stream holds no borrowing closure.
        // `buffered` keeps input order; the first failure aborts the whole check.
        let pending: Vec<_> = members
            .iter()
            .map(|member| self.is_member(key, member))
            .collect();
        stream::iter(pending)
            .buffered(self.max_in_flight)
            .try_collect()
            .await
    }

    async fn add_members(&self, key: &str, members: &[String]) -> StoreResult<()> {
        if members.is_empty() {
            return Ok(());
        }

        let mut command = Vec::with_capacity(members.len() + 2);
        command.push("SADD");
        command.push(key);
        command.extend(members.iter().map(String::as_str));

        let added = self.execute(&command).await?;
        if !added.is_number() {
            return Err(StoreError::protocol(format!("SADD returned {added}")));
        }
        tracing::debug!(requested = members.len(), added = %added, "SADD completed");
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        match self.execute(&["PING"]).await? {
            Value::String(reply) if reply.eq_ignore_ascii_case("PONG") => Ok(()),
            other => Err(StoreError::protocol(format!("PING answered {other}"))),
        }
    }

    fn backend_name(&self) -> &'static str {
        "rest"
    }
}

fn map_transport_error(err: reqwest::Error) -> StoreError {
    if err.is_decode() || err.is_builder() {
        StoreError::protocol(err.to_string())
    } else {
        // Connect failures, timeouts and broken bodies all mean we could not
        // get an answer.
        StoreError::unavailable(err.to_string())
    }
}

fn parse_reply(command: &str, status: StatusCode, body: &str) -> StoreResult<Value> {
    let reply: CommandReply = serde_json::from_str(body).map_err(|e| {
        StoreError::protocol(format!("{command} answered {status} with unreadable body: {e}"))
    })?;

    if let Some(error) = reply.error {
        return Err(StoreError::protocol(format!("{command} rejected ({status}): {error}")));
    }
    if !status.is_success() {
        return Err(StoreError::protocol(format!("{command} answered {status}")));
    }
    reply
        .result
        .ok_or_else(|| StoreError::protocol(format!("{command} reply has no result")))
}
