//! # blob-gateway: batch blob operations with per-key failure reporting
//!
//! `blob-gateway` implements the engine behind a blob-storage gateway: upload a
//! single object, presign many keys, delete many keys. Batch requests never
//! fail as a whole because one key failed. Each key ends up in exactly one of
//! the two output lists, successes or errors.
//!
//! ## Key Features
//!
//! - **Partial failure**: per-key errors carry a stable machine-readable code
//! - **Bounded concurrency**: one semaphore per executor caps backend load
//! - **Cancellation-safe**: keys not yet dispatched are reported as `CANCELLED`
//! - **Storage agnostic**: in-memory and S3-compatible stores, or bring your own
//! - **Server agnostic**: no HTTP coupling, see `blob-gateway-axum` for routes
//!
//! ## Quick Start
//!
//! ```rust
//! use blob_gateway::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> BlobResult<()> {
//! let store = MemoryBlobStore::new("demo");
//! store.insert("a", "hello");
//! store.insert("c", "world");
//!
//! let adapter = BlobAdapter::new(store, BlobConfig::default());
//!
//! let res = adapter
//!     .presign_urls(PresignUrlRequest {
//!         keys: vec!["a".into(), "b".into(), "c".into()],
//!     })
//!     .await?;
//!
//! assert_eq!(res.urls.len(), 2);
//! assert_eq!(res.errors[0].code, "NOT_FOUND");
//! assert_eq!(res.errors[0].key, "b");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   Your Service  │  ← HTTP, gRPC, CLI, jobs
//! ├─────────────────┤
//! │   BlobAdapter   │  ← validation, upload path, response shaping
//! ├─────────────────┤
//! │  BatchExecutor  │  ← per-key fan-out, error collection
//! ├─────────────────┤
//! │    BlobStore    │  ← single-key primitives
//! └─────────────────┘
//! ```

pub mod adapter;
pub mod checksum;
mod config;
mod error;
pub mod error_code;
pub mod executor;
pub mod key;
mod memory_store;
mod s3_store;
pub mod store;
mod types;

// Re-export main types for clean API
pub use adapter::BlobAdapter;
pub use checksum::ChecksumAlgorithm;
pub use config::BlobConfig;
pub use error::{BlobError, BlobResult};
pub use error_code::{to_api_error, ErrorCode};
pub use executor::{BatchExecutor, BatchOp, BatchOutcome, BatchSuccess, KeyOutcome};
pub use memory_store::MemoryBlobStore;
pub use s3_store::{S3CompatibleStore, S3Config};
pub use store::{BlobStore, FailureKind, ObjectMeta, StoreFailure};
pub use types::{
    BlobApiError, BlobUrl, ByteStream, DeleteRequest, DeleteResponse, PresignUrlRequest,
    PresignUrlResponse, UploadRequest, UploadResponse,
};

pub use tokio_util::sync::CancellationToken;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BlobAdapter, BlobApiError, BlobConfig, BlobError, BlobResult, BlobStore, BlobUrl,
        ByteStream, DeleteRequest, DeleteResponse, MemoryBlobStore, PresignUrlRequest,
        PresignUrlResponse, UploadRequest, UploadResponse,
    };
}
