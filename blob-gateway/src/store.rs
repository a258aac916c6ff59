use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Single-key object store operations the gateway drives.
///
/// Implementations are shared across concurrent calls through
/// `Arc<dyn BlobStore>`, so every method takes `&self`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `key`, replacing any previous content
    async fn upload_object(&self, key: &str, data: Bytes) -> Result<ObjectMeta, StoreFailure>;

    /// Generate a time-limited read URL for `key`
    async fn presign(&self, key: &str) -> Result<String, StoreFailure>;

    /// Permanently remove `key`
    async fn delete_object(&self, key: &str) -> Result<(), StoreFailure>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

/// Metadata of a freshly written object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub version: String,
    pub etag: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Category of a single-key failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    NotFound,
    AccessDenied,
    BackendUnavailable,
    InvalidKey,
    Timeout,
    ChecksumMismatch,
    Cancelled,
    Unknown,
}

impl FailureKind {
    pub const ALL: [FailureKind; 8] = [
        FailureKind::NotFound,
        FailureKind::AccessDenied,
        FailureKind::BackendUnavailable,
        FailureKind::InvalidKey,
        FailureKind::Timeout,
        FailureKind::ChecksumMismatch,
        FailureKind::Cancelled,
        FailureKind::Unknown,
    ];

    /// Human summary used as the message prefix
    pub fn summary(&self) -> &'static str {
        match self {
            FailureKind::NotFound => "object not found",
            FailureKind::AccessDenied => "access denied",
            FailureKind::BackendUnavailable => "storage backend unavailable",
            FailureKind::InvalidKey => "invalid key",
            FailureKind::Timeout => "operation timed out",
            FailureKind::ChecksumMismatch => "checksum mismatch",
            FailureKind::Cancelled => "operation cancelled",
            FailureKind::Unknown => "unknown storage error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.summary())
    }
}

/// Typed failure returned by a store for one key
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct StoreFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl StoreFailure {
    pub fn new<S: Into<String>>(kind: FailureKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::new(FailureKind::NotFound, message)
    }

    pub fn access_denied<S: Into<String>>(message: S) -> Self {
        Self::new(FailureKind::AccessDenied, message)
    }

    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::new(FailureKind::BackendUnavailable, message)
    }

    pub fn invalid_key<S: Into<String>>(message: S) -> Self {
        Self::new(FailureKind::InvalidKey, message)
    }

    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::new(FailureKind::Timeout, message)
    }

    pub fn checksum_mismatch<S: Into<String>>(message: S) -> Self {
        Self::new(FailureKind::ChecksumMismatch, message)
    }

    pub fn cancelled<S: Into<String>>(message: S) -> Self {
        Self::new(FailureKind::Cancelled, message)
    }

    pub fn unknown<S: Into<String>>(message: S) -> Self {
        Self::new(FailureKind::Unknown, message)
    }
}
