use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use chrono::SecondsFormat;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::checksum;
use crate::error_code::to_api_error;
use crate::executor::with_timeout;
use crate::key::validate_key;
use crate::{
    BatchExecutor, BlobConfig, BlobError, BlobResult, BlobStore, ByteStream, DeleteRequest,
    DeleteResponse, PresignUrlRequest, PresignUrlResponse, UploadRequest, UploadResponse,
};

/// The main blob adapter - embed it in whatever serves the requests
pub struct BlobAdapter {
    store: Arc<dyn BlobStore>,
    executor: BatchExecutor,
    config: BlobConfig,
}

impl BlobAdapter {
    /// Create a new blob adapter
    pub fn new<S: BlobStore + 'static>(store: S, config: BlobConfig) -> Self {
        Self::from_arc(Arc::new(store), config)
    }

    /// Create from a store that is already shared elsewhere
    pub fn from_arc(store: Arc<dyn BlobStore>, config: BlobConfig) -> Self {
        Self {
            executor: BatchExecutor::new(Arc::clone(&store), &config),
            store,
            config,
        }
    }

    /// Store a single object.
    ///
    /// The body is buffered and every supplied checksum verified before the
    /// store is called, so a rejected upload never leaves partial state.
    #[instrument(skip_all, fields(key = %request.key))]
    pub async fn upload(&self, request: UploadRequest, body: ByteStream) -> BlobResult<UploadResponse> {
        request.validate()?;
        let data = self.collect_body(body).await?;

        let key = request.key.as_str();
        validate_key(key).map_err(|failure| to_api_error(&failure, key))?;
        checksum::verify(&request, &data).map_err(|failure| to_api_error(&failure, key))?;

        let meta = with_timeout(self.config.per_key_timeout, self.store.upload_object(key, data))
            .await
            .map_err(|failure| {
                warn!(kind = ?failure.kind, error = %failure.message, "upload failed");
                to_api_error(&failure, key)
            })?;

        info!(size = meta.size, version = %meta.version, "upload stored");

        Ok(UploadResponse {
            key: request.key.clone(),
            version: meta.version,
            etag: meta.etag,
            size: meta.size as i64,
            last_modified: meta.last_modified.to_rfc3339_opts(SecondsFormat::Secs, true),
        })
    }

    /// Presign every requested key
    pub async fn presign_urls(&self, request: PresignUrlRequest) -> BlobResult<PresignUrlResponse> {
        self.presign_urls_with_cancel(request, &CancellationToken::new()).await
    }

    /// Presign every requested key; keys not yet dispatched when `cancel`
    /// fires are reported as CANCELLED
    pub async fn presign_urls_with_cancel(
        &self,
        request: PresignUrlRequest,
        cancel: &CancellationToken,
    ) -> BlobResult<PresignUrlResponse> {
        request.validate()?;
        self.check_batch_size(&request.keys)?;

        let outcome = self.executor.presign(&request.keys, cancel).await?;
        Ok(PresignUrlResponse {
            urls: outcome.successes,
            errors: outcome.failures,
        })
    }

    /// Delete every requested key
    pub async fn delete(&self, request: DeleteRequest) -> BlobResult<DeleteResponse> {
        self.delete_with_cancel(request, &CancellationToken::new()).await
    }

    /// Delete every requested key; keys not yet dispatched when `cancel`
    /// fires are reported as CANCELLED
    pub async fn delete_with_cancel(
        &self,
        request: DeleteRequest,
        cancel: &CancellationToken,
    ) -> BlobResult<DeleteResponse> {
        request.validate()?;
        self.check_batch_size(&request.keys)?;

        let outcome = self.executor.delete(&request.keys, cancel).await?;
        Ok(DeleteResponse {
            deleted: outcome.successes,
            errors: outcome.failures,
        })
    }

    /// Get configuration
    pub fn config(&self) -> &BlobConfig {
        &self.config
    }

    pub fn executor(&self) -> &BatchExecutor {
        &self.executor
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    fn check_batch_size(&self, keys: &[String]) -> BlobResult<()> {
        if keys.len() > self.config.max_batch_keys {
            return Err(BlobError::validation(format!(
                "keys must contain at most {} keys, got {}",
                self.config.max_batch_keys,
                keys.len()
            )));
        }
        Ok(())
    }

    async fn collect_body(&self, mut body: ByteStream) -> BlobResult<Bytes> {
        let max = self.config.max_blob_bytes;
        let mut data = BytesMut::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            let size = (data.len() + chunk.len()) as u64;
            if size > max {
                return Err(BlobError::PayloadTooLarge { size, max });
            }
            data.extend_from_slice(&chunk);
        }
        Ok(data.freeze())
    }
}
