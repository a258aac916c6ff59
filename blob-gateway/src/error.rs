use thiserror::Error;

use crate::types::BlobApiError;

/// Result type for blob gateway operations
pub type BlobResult<T> = Result<T, BlobError>;

/// Whole-request errors.
///
/// Per-key batch failures never show up here; they are collected into the
/// `errors` list of the batch response instead.
#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Invalid request: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Payload too large: {size} bytes (max: {max})")]
    PayloadTooLarge { size: u64, max: u64 },

    /// Single-key operation failed (upload path)
    #[error(transparent)]
    Object(#[from] BlobApiError),

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl BlobError {
    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error was raised before any backend call was made
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::PayloadTooLarge { .. })
    }
}

impl From<validator::ValidationErrors> for BlobError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages = Vec::new();
        for (field, field_errors) in errors.field_errors() {
            for e in field_errors {
                let msg = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} has invalid {}", field, e.code));
                messages.push(msg);
            }
        }
        messages.sort();
        Self::validation(messages.join("; "))
    }
}
