//! Check-and-record engine over a [`SetStore`].
//!
//! One call to [`UniquenessEngine::evaluate`] costs at most one membership
//! round and one insert round against the store, and takes no in-process
//! lock. Two batches racing on the same unseen fingerprint can both count it
//! as new; the store's set insert is idempotent, so the stored set is still
//! exact.

use crate::types::{Fingerprint, UniquenessRequest, UniquenessResult};
use crate::IntegrityError;
use std::collections::HashSet;
use std::sync::Arc;
use store::SetStore;

/// Key of the one set holding every recorded fingerprint.
pub const GLOBAL_FINGERPRINT_SET: &str = "global_fingerprints";

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Store key of the global fingerprint set.
    pub set_key: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            set_key: GLOBAL_FINGERPRINT_SET.to_string(),
        }
    }
}

/// Stateless uniqueness engine. Cheap to clone; all state lives in the store.
#[derive(Clone)]
pub struct UniquenessEngine {
    store: Arc<dyn SetStore>,
    config: EngineConfig,
}

impl UniquenessEngine {
    pub fn new(store: Arc<dyn SetStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn with_store(store: Arc<dyn SetStore>) -> Self {
        Self::new(store, EngineConfig::default())
    }

    pub fn store(&self) -> &Arc<dyn SetStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Classify `request` against the global set and record what is new.
    ///
    /// A fingerprint counts as new when the store does not hold it and it is
    /// the first occurrence in the batch; later repeats count as duplicates.
    /// Any store failure aborts the whole batch. When the membership check
    /// fails nothing is written.
    pub async fn evaluate(
        &self,
        request: &UniquenessRequest,
    ) -> Result<UniquenessResult, IntegrityError> {
        let total = request.len();
        if total == 0 {
            return Ok(UniquenessResult::empty());
        }

        let distinct = distinct_in_order(&request.fingerprints);
        let key = self.config.set_key.as_str();

        let present = self.store.check_membership(key, &distinct).await?;
        if present.len() != distinct.len() {
            return Err(IntegrityError::BackendProtocol(store::StoreError::protocol(
                format!(
                    "membership check answered {} flags for {} members",
                    present.len(),
                    distinct.len()
                ),
            )));
        }

        // `distinct` is already first-occurrence ordered, so its absent
        // members are exactly the new fingerprints in input order.
        let new_fingerprints: Vec<Fingerprint> = distinct
            .into_iter()
            .zip(present)
            .filter_map(|(fp, stored)| (!stored).then_some(fp))
            .collect();

        if !new_fingerprints.is_empty() {
            self.store.add_members(key, &new_fingerprints).await?;
            tracing::info!(
                backend = self.store.backend_name(),
                added = new_fingerprints.len(),
                "recorded new fingerprints in the global set"
            );
        }

        let result = UniquenessResult::from_new(total, new_fingerprints);
        tracing::debug!(
            total = result.total_fingerprints_received,
            new = result.new_fingerprints_found,
            duplicates = result.duplicate_fingerprints_found,
            score = result.global_uniqueness_score,
            "uniqueness batch evaluated"
        );
        Ok(result)
    }
}

/// Distinct fingerprints of `batch`, first occurrence first.
fn distinct_in_order(batch: &[Fingerprint]) -> Vec<Fingerprint> {
    let mut seen = HashSet::with_capacity(batch.len());
    batch
        .iter()
        .filter(|fp| seen.insert(fp.as_str()))
        .cloned()
        .collect()
}
