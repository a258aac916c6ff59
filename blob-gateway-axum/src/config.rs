use std::str::FromStr;
use std::sync::Arc;

use blob_gateway::{BlobAdapter, BlobConfig, BlobStore, MemoryBlobStore, S3CompatibleStore};

/// Which object store backs the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    S3,
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(StoreKind::Memory),
            "s3" => Ok(StoreKind::S3),
            other => Err(anyhow::anyhow!("unknown BLOB_STORE `{other}` (expected memory or s3)")),
        }
    }
}

/// Process configuration for the gateway binary
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreKind,
    pub blob: BlobConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3030,
            store: StoreKind::Memory,
            blob: BlobConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// `BLOB_HTTP_HOST`, `BLOB_HTTP_PORT`, `BLOB_STORE` plus the `BLOB_*`
    /// limits read by [`BlobConfig::from_env`]
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let store = match std::env::var("BLOB_STORE") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.store,
        };
        Ok(Self {
            host: env_var_or("BLOB_HTTP_HOST", defaults.host),
            port: env_var_or("BLOB_HTTP_PORT", defaults.port),
            store,
            blob: BlobConfig::from_env(),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connect the configured store and wrap it in an adapter
    pub async fn build_adapter(&self) -> anyhow::Result<BlobAdapter> {
        let store: Arc<dyn BlobStore> = match self.store {
            StoreKind::Memory => Arc::new(MemoryBlobStore::default()),
            StoreKind::S3 => Arc::new(S3CompatibleStore::from_env().await?),
        };
        tracing::info!(store = store.name(), "object store ready");
        Ok(BlobAdapter::from_arc(store, self.blob.clone()))
    }
}

fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
