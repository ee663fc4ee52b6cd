//! Concurrent batches sharing one engine and one store.

use integrity::{GLOBAL_FINGERPRINT_SET, UniquenessEngine, UniquenessRequest};
use std::collections::HashSet;
use std::sync::Arc;
use store::{InMemorySetStore, SetStore};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_batches_leave_an_exact_set() {
    let store = Arc::new(InMemorySetStore::new());
    let engine = UniquenessEngine::with_store(store.clone());

    // Each task submits a window overlapping its neighbours.
    let handles: Vec<_> = (0..16)
        .map(|task| {
            let engine = engine.clone();
            tokio::spawn(async move {
                let batch: Vec<String> = (task * 5..task * 5 + 20)
                    .map(|i| format!("fp-{i}"))
                    .collect();
                engine
                    .evaluate(&UniquenessRequest::new(batch))
                    .await
                    .expect("evaluate should succeed")
            })
        })
        .collect();

    let mut reported_new = 0;
    for handle in handles {
        let result = handle.await.unwrap();
        assert_eq!(result.total_fingerprints_received, 20);
        assert_eq!(
            result.total_fingerprints_received,
            result.new_fingerprints_found + result.duplicate_fingerprints_found
        );
        reported_new += result.new_fingerprints_found;
    }

    let union: HashSet<String> = (0..16 * 5 + 15).map(|i| format!("fp-{i}")).collect();
    assert_eq!(store.cardinality(GLOBAL_FINGERPRINT_SET).unwrap(), union.len());
    // Racing batches may both count a fingerprint as new, never fewer.
    assert!(reported_new >= union.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn identical_concurrent_batches_never_lose_members() {
    let store = Arc::new(InMemorySetStore::new());
    let engine = UniquenessEngine::with_store(store.clone());
    let batch: Vec<String> = (0..100).map(|i| format!("{i:x}")).collect();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = engine.clone();
            let request = UniquenessRequest::new(batch.clone());
            tokio::spawn(async move { engine.evaluate(&request).await.unwrap() })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    let flags = store
        .check_membership(GLOBAL_FINGERPRINT_SET, &batch)
        .await
        .unwrap();
    assert!(flags.iter().all(|present| *present));

    // After the dust settles everything is a duplicate.
    let after = engine
        .evaluate(&UniquenessRequest::new(batch))
        .await
        .unwrap();
    assert_eq!(after.new_fingerprints_found, 0);
}
