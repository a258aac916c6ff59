use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use blob_gateway::{
    BatchExecutor, BatchOp, BlobAdapter, BlobConfig, BlobError, BlobStore, CancellationToken,
    DeleteRequest, FailureKind, MemoryBlobStore, PresignUrlRequest,
};
use proptest::prelude::*;

/// Test factory functions
fn keys(items: &[&str]) -> Vec<String> {
    items.iter().map(|k| k.to_string()).collect()
}

fn seeded_store(present: &[&str]) -> Arc<MemoryBlobStore> {
    let store = Arc::new(MemoryBlobStore::new("test"));
    for key in present {
        store.insert(*key, format!("content of {key}"));
    }
    store
}

fn executor(store: &Arc<MemoryBlobStore>, config: BlobConfig) -> BatchExecutor {
    let store: Arc<dyn BlobStore> = store.clone();
    BatchExecutor::new(store, &config)
}

fn failure_keys(failures: &[blob_gateway::BlobApiError]) -> Vec<&str> {
    failures.iter().map(|f| f.key.as_str()).collect()
}

#[tokio::test]
async fn partial_failure_keeps_order_in_both_lists() {
    let store = seeded_store(&["a", "c"]);
    let exec = executor(&store, BlobConfig::default());

    let outcome = exec
        .presign(&keys(&["a", "b", "c"]), &CancellationToken::new())
        .await
        .unwrap();

    let urls: Vec<_> = outcome.successes.iter().map(|u| u.key.as_str()).collect();
    assert_eq!(urls, vec!["a", "c"]);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].code, "NOT_FOUND");
    assert_eq!(outcome.failures[0].key, "b");
}

#[tokio::test]
async fn full_failure_accounts_for_every_key() {
    let store = seeded_store(&[]);
    let exec = executor(&store, BlobConfig::default());

    let outcome = exec
        .delete(&keys(&["x", "y", "z"]), &CancellationToken::new())
        .await
        .unwrap();

    assert!(outcome.successes.is_empty());
    assert_eq!(failure_keys(&outcome.failures), vec!["x", "y", "z"]);
    assert!(outcome.failures.iter().all(|f| f.code == "NOT_FOUND"));
}

#[tokio::test]
async fn duplicate_keys_are_reported_per_occurrence() {
    let store = seeded_store(&["a"]);
    let exec = executor(&store, BlobConfig::default());

    let outcome = exec
        .presign(&keys(&["a", "a"]), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.successes.len(), 2);
    assert_eq!(outcome.successes[0].key, "a");
    assert_eq!(outcome.successes[1].key, "a");
    // Independent presigns, independent URLs
    assert_ne!(outcome.successes[0].url, outcome.successes[1].url);
    assert_eq!(store.calls(), 2);
}

#[tokio::test]
async fn duplicate_delete_succeeds_once_then_not_found() {
    let store = seeded_store(&["a"]);
    let exec = executor(&store, BlobConfig::default().with_max_concurrency(1));

    let outcome = exec
        .delete(&keys(&["a", "a"]), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.successes, vec!["a"]);
    assert_eq!(failure_keys(&outcome.failures), vec!["a"]);
    assert_eq!(outcome.failures[0].code, "NOT_FOUND");
}

#[tokio::test]
async fn empty_key_list_is_rejected_before_backend_calls() {
    let store = seeded_store(&["a"]);
    let exec = executor(&store, BlobConfig::default());

    let err = exec
        .execute(&[], BatchOp::Delete, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, BlobError::Validation { .. }));
    assert_eq!(store.calls(), 0);
    assert!(store.contains("a"));
}

#[tokio::test]
async fn failure_on_one_key_does_not_affect_others() {
    let store = seeded_store(&["a", "b", "c"]);
    store.fail_key("b", FailureKind::AccessDenied);
    let exec = executor(&store, BlobConfig::default());

    let outcome = exec
        .delete(&keys(&["a", "b", "c"]), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.successes, vec!["a", "c"]);
    assert_eq!(outcome.failures[0].code, "ACCESS_DENIED");
    assert!(!store.contains("a"));
    assert!(store.contains("b"));
    assert!(!store.contains("c"));
}

#[tokio::test]
async fn invalid_keys_fail_without_backend_call() {
    let store = seeded_store(&["ok"]);
    let exec = executor(&store, BlobConfig::default());

    let outcome = exec
        .presign(&keys(&["ok", "", "bad\u{7}key"]), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.successes.len(), 1);
    assert_eq!(failure_keys(&outcome.failures), vec!["", "bad\u{7}key"]);
    assert!(outcome.failures.iter().all(|f| f.code == "INVALID_KEY"));
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn execute_wraps_successes_in_tagged_variants() {
    let store = seeded_store(&["a"]);
    let exec = executor(&store, BlobConfig::default());

    let presigned = exec
        .execute(&keys(&["a", "missing"]), BatchOp::Presign, &CancellationToken::new())
        .await
        .unwrap();
    assert!(matches!(presigned.successes[0], blob_gateway::BatchSuccess::Presigned(_)));
    assert_eq!(presigned.successes[0].key(), "a");
    assert_eq!(presigned.len(), 2);

    let deleted = exec
        .execute(&keys(&["a"]), BatchOp::Delete, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(
        deleted.successes,
        vec![blob_gateway::BatchSuccess::Deleted("a".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn success_order_follows_input_not_completion() {
    let names: Vec<String> = (0..8).map(|i| format!("k{i}")).collect();
    let store = Arc::new(MemoryBlobStore::new("test"));
    for (i, key) in names.iter().enumerate() {
        store.insert(key.clone(), "x");
        // Earlier keys finish later
        store.delay_key(key.clone(), Duration::from_millis(100 - i as u64 * 10));
    }
    let exec = executor(&store, BlobConfig::default());

    let outcome = exec.presign(&names, &CancellationToken::new()).await.unwrap();

    let got: Vec<_> = outcome.successes.iter().map(|u| u.key.clone()).collect();
    assert_eq!(got, names);
}

#[tokio::test(start_paused = true)]
async fn backend_concurrency_is_bounded() {
    let names: Vec<String> = (0..20).map(|i| format!("k{i}")).collect();
    let store = Arc::new(MemoryBlobStore::new("test").with_latency(Duration::from_millis(20)));
    for key in &names {
        store.insert(key.clone(), "x");
    }
    let exec = executor(&store, BlobConfig::default().with_max_concurrency(4));

    let outcome = exec.presign(&names, &CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.successes.len(), 20);
    assert!(store.max_in_flight() <= 4, "peak {}", store.max_in_flight());
    assert!(store.max_in_flight() >= 2);
    assert_eq!(exec.available_permits(), 4);
}

#[tokio::test(start_paused = true)]
async fn concurrency_bound_is_shared_between_batches() {
    let store = Arc::new(MemoryBlobStore::new("test").with_latency(Duration::from_millis(20)));
    let first: Vec<String> = (0..6).map(|i| format!("a{i}")).collect();
    let second: Vec<String> = (0..6).map(|i| format!("b{i}")).collect();
    for key in first.iter().chain(second.iter()) {
        store.insert(key.clone(), "x");
    }
    let exec = executor(&store, BlobConfig::default().with_max_concurrency(2));
    let token = CancellationToken::new();

    let (a, b) = tokio::join!(exec.presign(&first, &token), exec.presign(&second, &token));

    assert_eq!(a.unwrap().successes.len(), 6);
    assert_eq!(b.unwrap().successes.len(), 6);
    assert!(store.max_in_flight() <= 2);
}

#[tokio::test]
async fn cancelled_before_start_reports_every_key_cancelled() {
    let store = seeded_store(&["a", "b"]);
    let exec = executor(&store, BlobConfig::default());
    let token = CancellationToken::new();
    token.cancel();

    let outcome = exec.delete(&keys(&["a", "b", "a"]), &token).await.unwrap();

    assert!(outcome.successes.is_empty());
    assert_eq!(failure_keys(&outcome.failures), vec!["a", "b", "a"]);
    assert!(outcome.failures.iter().all(|f| f.code == "CANCELLED"));
    assert_eq!(store.calls(), 0);
    assert!(store.contains("a") && store.contains("b"));
}

#[tokio::test(start_paused = true)]
async fn cancel_mid_batch_lets_dispatched_keys_finish() {
    let names: Vec<String> = (0..5).map(|i| format!("k{i}")).collect();
    let store = Arc::new(MemoryBlobStore::new("test").with_latency(Duration::from_millis(50)));
    for key in &names {
        store.insert(key.clone(), "x");
    }
    let exec = executor(&store, BlobConfig::default().with_max_concurrency(1));
    let token = CancellationToken::new();

    let canceller = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(75)).await;
            token.cancel();
        })
    };

    let outcome = exec.delete(&names, &token).await.unwrap();
    canceller.await.unwrap();

    assert_eq!(outcome.len(), names.len());
    assert_eq!(outcome.successes.first().map(String::as_str), Some("k0"));
    assert!(outcome.failures.len() >= 2);
    assert!(outcome.failures.iter().all(|f| f.code == "CANCELLED"));
    // Only dispatched keys touched the backend, and all of them completed
    assert_eq!(store.calls(), outcome.successes.len());
    for key in &outcome.successes {
        assert!(!store.contains(key));
    }
    for failure in &outcome.failures {
        assert!(store.contains(&failure.key));
    }
}

#[tokio::test(start_paused = true)]
async fn batch_deadline_cancels_undispatched_keys() {
    let names: Vec<String> = (0..4).map(|i| format!("k{i}")).collect();
    let store = Arc::new(MemoryBlobStore::new("test").with_latency(Duration::from_millis(20)));
    for key in &names {
        store.insert(key.clone(), "x");
    }
    let config = BlobConfig::default()
        .with_max_concurrency(1)
        .with_batch_timeout(Duration::from_millis(30));
    let exec = executor(&store, config);

    let outcome = exec.presign(&names, &CancellationToken::new()).await.unwrap();

    let ok: Vec<_> = outcome.successes.iter().map(|u| u.key.as_str()).collect();
    assert_eq!(ok, vec!["k0", "k1"]);
    assert_eq!(failure_keys(&outcome.failures), vec!["k2", "k3"]);
    assert!(outcome.failures.iter().all(|f| f.code == "CANCELLED"));
    assert!(outcome.failures[0].message.contains("deadline"));
}

#[tokio::test(start_paused = true)]
async fn slow_key_times_out_without_blocking_others() {
    let store = seeded_store(&["fast", "slow", "also-fast"]);
    store.delay_key("slow", Duration::from_secs(5));
    let config = BlobConfig::default().with_per_key_timeout(Duration::from_millis(100));
    let exec = executor(&store, config);

    let outcome = exec
        .presign(&keys(&["fast", "slow", "also-fast"]), &CancellationToken::new())
        .await
        .unwrap();

    let ok: Vec<_> = outcome.successes.iter().map(|u| u.key.as_str()).collect();
    assert_eq!(ok, vec!["fast", "also-fast"]);
    assert_eq!(outcome.failures[0].key, "slow");
    assert_eq!(outcome.failures[0].code, "TIMEOUT");
}

#[tokio::test]
async fn adapter_rejects_oversized_and_empty_batches() {
    let store = seeded_store(&["a", "b", "c"]);
    let adapter = BlobAdapter::from_arc(store.clone(), BlobConfig::default().with_max_batch_keys(2));

    let err = adapter
        .delete(DeleteRequest { keys: keys(&["a", "b", "c"]) })
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let err = adapter
        .presign_urls(PresignUrlRequest { keys: vec![] })
        .await
        .unwrap_err();
    assert!(err.is_validation());

    assert_eq!(store.calls(), 0);
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn adapter_shapes_wire_responses() {
    let store = seeded_store(&["a"]);
    let adapter = BlobAdapter::from_arc(store.clone(), BlobConfig::default());

    let presigned = adapter
        .presign_urls(PresignUrlRequest { keys: keys(&["a", "b"]) })
        .await
        .unwrap();
    assert_eq!(presigned.urls.len(), 1);
    assert_eq!(presigned.errors.len(), 1);

    let deleted = adapter
        .delete(DeleteRequest { keys: keys(&["a", "b"]) })
        .await
        .unwrap();
    assert_eq!(deleted.deleted, vec!["a"]);
    assert_eq!(deleted.errors[0].key, "b");
    assert_eq!(deleted.errors[0].code, "NOT_FOUND");
}

fn multiset<'a>(items: impl Iterator<Item = &'a str>) -> HashMap<&'a str, usize> {
    let mut counts = HashMap::new();
    for item in items {
        *counts.entry(item).or_insert(0) += 1;
    }
    counts
}

proptest! {
    #[test]
    fn every_key_lands_in_exactly_one_list(
        batch in proptest::collection::vec(prop::sample::select(vec!["a", "b", "c", "d", "e", ""]), 1..40),
        present in proptest::collection::hash_set(prop::sample::select(vec!["a", "b", "c", "d", "e"]), 0..5),
        denied in proptest::option::of(prop::sample::select(vec!["a", "b", "c"])),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let store = Arc::new(MemoryBlobStore::new("prop"));
        for key in &present {
            store.insert(*key, "x");
        }
        if let Some(key) = denied {
            store.fail_key(key, FailureKind::AccessDenied);
        }
        let exec = executor(&store, BlobConfig::default().with_max_concurrency(3));
        let input: Vec<String> = batch.iter().map(|k| k.to_string()).collect();

        let outcome = rt
            .block_on(exec.presign(&input, &CancellationToken::new()))
            .unwrap();

        let ok = multiset(outcome.successes.iter().map(|u| u.key.as_str()));
        let failed = multiset(outcome.failures.iter().map(|f| f.key.as_str()));
        let mut combined = ok.clone();
        for (key, n) in &failed {
            *combined.entry(*key).or_insert(0) += n;
        }
        prop_assert_eq!(combined, multiset(batch.iter().copied()));

        // Presign is read-only, so a key's outcome is the same for every occurrence
        for key in ok.keys() {
            prop_assert!(!failed.contains_key(key));
        }

        // Each list is the input subsequence of its members
        let expected_ok: Vec<&str> = batch.iter().copied().filter(|k| ok.contains_key(k)).collect();
        let got_ok: Vec<&str> = outcome.successes.iter().map(|u| u.key.as_str()).collect();
        prop_assert_eq!(got_ok, expected_ok);
    }
}
