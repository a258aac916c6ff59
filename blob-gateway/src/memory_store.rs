use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::store::{BlobStore, FailureKind, ObjectMeta, StoreFailure};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    version: String,
    etag: String,
    last_modified: DateTime<Utc>,
}

/// In-process object store.
///
/// Serves as the default backend for local runs and as the fake client in
/// tests: failures and latency can be injected per key, and call counts are
/// tracked.
pub struct MemoryBlobStore {
    bucket: String,
    presign_expiry: Duration,
    latency: Option<Duration>,
    objects: RwLock<HashMap<String, StoredObject>>,
    failures: RwLock<HashMap<String, FailureKind>>,
    key_latency: RwLock<HashMap<String, Duration>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new("memory")
    }
}

impl MemoryBlobStore {
    pub fn new<S: Into<String>>(bucket: S) -> Self {
        Self {
            bucket: bucket.into(),
            presign_expiry: Duration::from_secs(3600),
            latency: None,
            objects: RwLock::new(HashMap::new()),
            failures: RwLock::new(HashMap::new()),
            key_latency: RwLock::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Delay every backend call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_presign_expiry(mut self, expiry: Duration) -> Self {
        self.presign_expiry = expiry;
        self
    }

    /// Seed an object without counting a backend call
    pub fn insert<K: Into<String>, D: Into<Bytes>>(&self, key: K, data: D) {
        let object = Self::build_object(data.into());
        self.objects.write().insert(key.into(), object);
    }

    /// Make every call for `key` fail with `kind`
    pub fn fail_key<K: Into<String>>(&self, key: K, kind: FailureKind) {
        self.failures.write().insert(key.into(), kind);
    }

    pub fn clear_failure(&self, key: &str) {
        self.failures.write().remove(key);
    }

    /// Delay calls for `key` on top of the global latency
    pub fn delay_key<K: Into<String>>(&self, key: K, delay: Duration) {
        self.key_latency.write().insert(key.into(), delay);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.read().contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.objects.read().get(key).map(|o| o.data.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Backend calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Peak number of concurrent backend calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn build_object(data: Bytes) -> StoredObject {
        let digest = Sha256::digest(&data);
        StoredObject {
            etag: format!("\"{}\"", hex::encode(&digest[..16])),
            version: Uuid::new_v4().simple().to_string(),
            last_modified: Utc::now(),
            data,
        }
    }

    /// Count the call, apply latency and injected failures
    async fn enter(&self, key: &str) -> Result<InFlight<'_>, StoreFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let guard = InFlight(self);

        let delay = self.key_latency.read().get(key).copied();
        let total = self.latency.unwrap_or_default() + delay.unwrap_or_default();
        if !total.is_zero() {
            tokio::time::sleep(total).await;
        }

        if let Some(kind) = self.failures.read().get(key).copied() {
            return Err(StoreFailure::new(
                kind,
                format!("injected failure for bucket {}", self.bucket),
            ));
        }
        Ok(guard)
    }
}

/// Percent-encode each `/`-separated segment of `key`
fn encode_key_path(key: &str) -> String {
    key.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

struct InFlight<'a>(&'a MemoryBlobStore);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload_object(&self, key: &str, data: Bytes) -> Result<ObjectMeta, StoreFailure> {
        let _guard = self.enter(key).await?;

        let object = Self::build_object(data);
        let meta = ObjectMeta {
            version: object.version.clone(),
            etag: object.etag.clone(),
            size: object.data.len() as u64,
            last_modified: object.last_modified,
        };
        self.objects.write().insert(key.to_string(), object);
        Ok(meta)
    }

    async fn presign(&self, key: &str) -> Result<String, StoreFailure> {
        let _guard = self.enter(key).await?;

        if !self.contains(key) {
            return Err(StoreFailure::not_found(format!("no object {} in {}", key, self.bucket)));
        }

        let expires_at = Utc::now() + chrono::Duration::seconds(self.presign_expiry.as_secs() as i64);
        Ok(format!(
            "memory://{}/{}?expires={}&signature={}",
            self.bucket,
            encode_key_path(key),
            expires_at.timestamp(),
            Uuid::new_v4().simple()
        ))
    }

    async fn delete_object(&self, key: &str) -> Result<(), StoreFailure> {
        let _guard = self.enter(key).await?;

        match self.objects.write().remove(key) {
            Some(_) => Ok(()),
            None => Err(StoreFailure::not_found(format!("no object {} in {}", key, self.bucket))),
        }
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
