use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::error_code::to_api_error;
use crate::key::validate_key;
use crate::{BlobApiError, BlobConfig, BlobError, BlobResult, BlobStore, BlobUrl, StoreFailure};

/// Operation applied to every key of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOp {
    Presign,
    Delete,
}

impl BatchOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchOp::Presign => "presign",
            BatchOp::Delete => "delete",
        }
    }
}

/// Success payload of one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchSuccess {
    Presigned(BlobUrl),
    Deleted(String),
}

impl BatchSuccess {
    pub fn key(&self) -> &str {
        match self {
            BatchSuccess::Presigned(url) => &url.key,
            BatchSuccess::Deleted(key) => key,
        }
    }
}

/// Outcome of a single key: a success payload or its API error, never both
pub type KeyOutcome<T> = Result<T, BlobApiError>;

/// Aggregate result of a batch.
///
/// Every input key occurrence lands in exactly one of the two lists, and each
/// list keeps the input order of its own members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome<T> {
    pub successes: Vec<T>,
    pub failures: Vec<BlobApiError>,
}

impl<T> BatchOutcome<T> {
    /// Partition per-key outcomes, preserving their order
    pub fn from_outcomes<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = KeyOutcome<T>>,
    {
        let mut successes = Vec::new();
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(success) => successes.push(success),
                Err(failure) => failures.push(failure),
            }
        }
        Self { successes, failures }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> BatchOutcome<U> {
        BatchOutcome {
            successes: self.successes.into_iter().map(f).collect(),
            failures: self.failures,
        }
    }

    /// Number of keys accounted for
    pub fn len(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Runs one operation over many keys against a shared store.
///
/// Backend concurrency is bounded by a semaphore owned by the executor, so the
/// bound holds across every batch it runs, not just within one.
pub struct BatchExecutor {
    store: Arc<dyn BlobStore>,
    permits: Arc<Semaphore>,
    per_key_timeout: Option<Duration>,
    batch_timeout: Option<Duration>,
}

enum Dispatch {
    Ready,
    Cancelled,
    DeadlineExceeded,
}

impl BatchExecutor {
    pub fn new(store: Arc<dyn BlobStore>, config: &BlobConfig) -> Self {
        Self {
            store,
            permits: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
            per_key_timeout: config.per_key_timeout,
            batch_timeout: config.batch_timeout,
        }
    }

    /// Run `op` for every key and collect successes and per-key failures.
    ///
    /// Only an empty key list is rejected as a whole; everything else is
    /// reported per key.
    pub async fn execute(
        &self,
        keys: &[String],
        op: BatchOp,
        cancel: &CancellationToken,
    ) -> BlobResult<BatchOutcome<BatchSuccess>> {
        match op {
            BatchOp::Presign => Ok(self.presign(keys, cancel).await?.map(BatchSuccess::Presigned)),
            BatchOp::Delete => Ok(self.delete(keys, cancel).await?.map(BatchSuccess::Deleted)),
        }
    }

    /// Presign every key
    pub async fn presign(
        &self,
        keys: &[String],
        cancel: &CancellationToken,
    ) -> BlobResult<BatchOutcome<BlobUrl>> {
        self.run(BatchOp::Presign, keys, cancel, |store, key| async move {
            let url = store.presign(&key).await?;
            Ok(BlobUrl::new(key, url))
        })
        .await
    }

    /// Delete every key
    pub async fn delete(
        &self,
        keys: &[String],
        cancel: &CancellationToken,
    ) -> BlobResult<BatchOutcome<String>> {
        self.run(BatchOp::Delete, keys, cancel, |store, key| async move {
            store.delete_object(&key).await?;
            Ok(key)
        })
        .await
    }

    /// Backend call slots currently free
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    #[instrument(skip_all, fields(op = op.as_str(), keys = keys.len(), store = self.store.name()))]
    async fn run<T, F, Fut>(
        &self,
        op: BatchOp,
        keys: &[String],
        cancel: &CancellationToken,
        call: F,
    ) -> BlobResult<BatchOutcome<T>>
    where
        F: Fn(Arc<dyn BlobStore>, String) -> Fut,
        Fut: Future<Output = Result<T, StoreFailure>>,
    {
        if keys.is_empty() {
            return Err(BlobError::validation("keys must contain at least one key"));
        }

        let deadline = self.batch_timeout.map(|t| Instant::now() + t);
        let outcomes = join_all(
            keys.iter()
                .map(|key| self.run_key(key, cancel, deadline, &call)),
        )
        .await;

        let outcome = BatchOutcome::from_outcomes(outcomes);
        info!(
            succeeded = outcome.successes.len(),
            failed = outcome.failures.len(),
            "batch {} finished",
            op.as_str()
        );
        Ok(outcome)
    }

    async fn run_key<T, F, Fut>(
        &self,
        key: &str,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
        call: &F,
    ) -> KeyOutcome<T>
    where
        F: Fn(Arc<dyn BlobStore>, String) -> Fut,
        Fut: Future<Output = Result<T, StoreFailure>>,
    {
        let result = match validate_key(key) {
            Ok(()) => self.dispatch(key, cancel, deadline, call).await,
            Err(failure) => Err(failure),
        };

        result.map_err(|failure| {
            debug!(key, kind = ?failure.kind, error = %failure.message, "key failed");
            to_api_error(&failure, key)
        })
    }

    async fn dispatch<T, F, Fut>(
        &self,
        key: &str,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
        call: &F,
    ) -> Result<T, StoreFailure>
    where
        F: Fn(Arc<dyn BlobStore>, String) -> Fut,
        Fut: Future<Output = Result<T, StoreFailure>>,
    {
        // A key counts as dispatched once it holds a permit. Until then the
        // batch may still be cancelled without touching the backend.
        let (state, _permit) = tokio::select! {
            biased;
            _ = cancel.cancelled() => (Dispatch::Cancelled, None),
            _ = wait_until(deadline) => (Dispatch::DeadlineExceeded, None),
            permit = self.permits.acquire() => match permit {
                Ok(permit) => (Dispatch::Ready, Some(permit)),
                Err(_) => (Dispatch::Cancelled, None),
            },
        };

        match state {
            Dispatch::Ready => {}
            Dispatch::Cancelled => {
                return Err(StoreFailure::cancelled("batch cancelled before dispatch"));
            }
            Dispatch::DeadlineExceeded => {
                return Err(StoreFailure::cancelled("batch deadline exceeded before dispatch"));
            }
        }

        with_timeout(self.per_key_timeout, call(Arc::clone(&self.store), key.to_string())).await
    }
}

/// Bound `fut` by `limit`, reporting expiry as a timeout failure
pub(crate) async fn with_timeout<T, Fut>(limit: Option<Duration>, fut: Fut) -> Result<T, StoreFailure>
where
    Fut: Future<Output = Result<T, StoreFailure>>,
{
    match limit {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreFailure::timeout(format!("no response within {:?}", limit))),
        },
        None => fut.await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
