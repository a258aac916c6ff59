use std::time::Duration;

/// Configuration for blob operations
#[derive(Debug, Clone)]
pub struct BlobConfig {
    /// Upper bound on keys accepted in one presign/delete request
    pub max_batch_keys: usize,

    /// Max backend calls in flight per executor, shared by all batches
    pub max_concurrency: usize,

    /// Bound on a single backend call. Expiry is reported as a TIMEOUT failure.
    pub per_key_timeout: Option<Duration>,

    /// Deadline for a whole batch. Keys not dispatched by then are CANCELLED.
    pub batch_timeout: Option<Duration>,

    /// Absolute max size allowed for a single upload (safety guard)
    pub max_blob_bytes: u64,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            max_batch_keys: 1000, // S3 DeleteObjects limit
            max_concurrency: 16,
            per_key_timeout: Some(Duration::from_secs(30)),
            batch_timeout: None,
            max_blob_bytes: 5 * 1024 * 1024 * 1024, // 5GB
        }
    }
}

impl BlobConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `BLOB_*` environment variables.
    ///
    /// Unset or unparsable values keep their default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_batch_keys: env_or("BLOB_MAX_BATCH_KEYS", defaults.max_batch_keys),
            max_concurrency: env_or("BLOB_MAX_CONCURRENCY", defaults.max_concurrency).max(1),
            per_key_timeout: env_secs("BLOB_PER_KEY_TIMEOUT_SECS").or(defaults.per_key_timeout),
            batch_timeout: env_secs("BLOB_BATCH_TIMEOUT_SECS").or(defaults.batch_timeout),
            max_blob_bytes: env_or("BLOB_MAX_BLOB_BYTES", defaults.max_blob_bytes),
        }
    }

    /// Set max keys per batch request
    pub fn with_max_batch_keys(mut self, max: usize) -> Self {
        self.max_batch_keys = max;
        self
    }

    /// Set backend concurrency bound (at least 1)
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    /// Set per-key timeout
    pub fn with_per_key_timeout(mut self, timeout: Duration) -> Self {
        self.per_key_timeout = Some(timeout);
        self
    }

    /// Disable per-key timeout
    pub fn without_per_key_timeout(mut self) -> Self {
        self.per_key_timeout = None;
        self
    }

    /// Set whole-batch deadline
    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = Some(timeout);
        self
    }

    /// Set max blob size
    pub fn with_max_blob_bytes(mut self, bytes: u64) -> Self {
        self.max_blob_bytes = bytes;
        self
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_secs(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_bounded() {
        let config = BlobConfig::default();
        assert_eq!(config.max_batch_keys, 1000);
        assert_eq!(config.max_concurrency, 16);
        assert_eq!(config.per_key_timeout, Some(Duration::from_secs(30)));
        assert!(config.batch_timeout.is_none());
    }

    #[test]
    fn concurrency_never_drops_to_zero() {
        let config = BlobConfig::new().with_max_concurrency(0);
        assert_eq!(config.max_concurrency, 1);
    }

    #[test]
    fn env_overrides_and_bad_values_fall_back() {
        std::env::set_var("BLOB_MAX_BATCH_KEYS", "25");
        std::env::set_var("BLOB_MAX_CONCURRENCY", "not-a-number");
        std::env::set_var("BLOB_BATCH_TIMEOUT_SECS", "9");

        let config = BlobConfig::from_env();
        assert_eq!(config.max_batch_keys, 25);
        assert_eq!(config.max_concurrency, 16);
        assert_eq!(config.batch_timeout, Some(Duration::from_secs(9)));

        std::env::remove_var("BLOB_MAX_BATCH_KEYS");
        std::env::remove_var("BLOB_MAX_CONCURRENCY");
        std::env::remove_var("BLOB_BATCH_TIMEOUT_SECS");
    }
}
