use crate::store::StoreFailure;

/// Longest key accepted, in bytes (S3 object key limit)
pub const MAX_KEY_BYTES: usize = 1024;

/// Check that `key` can name an object.
pub fn validate_key(key: &str) -> Result<(), StoreFailure> {
    if key.is_empty() {
        return Err(StoreFailure::invalid_key("key must not be empty"));
    }
    if key.len() > MAX_KEY_BYTES {
        return Err(StoreFailure::invalid_key(format!(
            "key is {} bytes (max {})",
            key.len(),
            MAX_KEY_BYTES
        )));
    }
    if key.chars().any(char::is_control) {
        return Err(StoreFailure::invalid_key("key contains control characters"));
    }
    Ok(())
}
