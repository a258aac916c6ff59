use std::sync::Arc;

use blob_gateway::{BlobAdapter, CancellationToken};

/// Shared handler state
#[derive(Clone)]
pub struct GatewayState {
    pub blobs: Arc<BlobAdapter>,
    /// Cancelled on shutdown; batches in flight stop dispatching new keys
    pub shutdown: CancellationToken,
}

impl GatewayState {
    pub fn new(blobs: BlobAdapter) -> Self {
        Self {
            blobs: Arc::new(blobs),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }
}
