//! Maps store failures to the stable per-key error representation.
//!
//! The code depends on the failure kind alone. Messages may carry backend
//! detail and are free to change between backend versions.

use std::fmt;

use crate::store::{FailureKind, StoreFailure};
use crate::types::BlobApiError;

/// Machine-readable per-key error code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotFound,
    AccessDenied,
    BackendUnavailable,
    InvalidKey,
    Timeout,
    ChecksumMismatch,
    Cancelled,
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::AccessDenied => "ACCESS_DENIED",
            ErrorCode::BackendUnavailable => "BACKEND_UNAVAILABLE",
            ErrorCode::InvalidKey => "INVALID_KEY",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::ChecksumMismatch => "CHECKSUM_MISMATCH",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::Unknown => "UNKNOWN",
        }
    }

    /// Parse a code string back. Unrecognised codes yield `None`.
    pub fn parse(code: &str) -> Option<Self> {
        let code = match code {
            "NOT_FOUND" => ErrorCode::NotFound,
            "ACCESS_DENIED" => ErrorCode::AccessDenied,
            "BACKEND_UNAVAILABLE" => ErrorCode::BackendUnavailable,
            "INVALID_KEY" => ErrorCode::InvalidKey,
            "TIMEOUT" => ErrorCode::Timeout,
            "CHECKSUM_MISMATCH" => ErrorCode::ChecksumMismatch,
            "CANCELLED" => ErrorCode::Cancelled,
            "UNKNOWN" => ErrorCode::Unknown,
            _ => return None,
        };
        Some(code)
    }

    /// HTTP status used when a single-key operation fails as a whole request
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorCode::NotFound => 404,
            ErrorCode::AccessDenied => 403,
            ErrorCode::InvalidKey => 400,
            ErrorCode::ChecksumMismatch => 422,
            ErrorCode::Cancelled => 499,
            ErrorCode::Unknown => 500,
            ErrorCode::BackendUnavailable => 503,
            ErrorCode::Timeout => 504,
        }
    }
}

impl From<FailureKind> for ErrorCode {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::NotFound => ErrorCode::NotFound,
            FailureKind::AccessDenied => ErrorCode::AccessDenied,
            FailureKind::BackendUnavailable => ErrorCode::BackendUnavailable,
            FailureKind::InvalidKey => ErrorCode::InvalidKey,
            FailureKind::Timeout => ErrorCode::Timeout,
            FailureKind::ChecksumMismatch => ErrorCode::ChecksumMismatch,
            FailureKind::Cancelled => ErrorCode::Cancelled,
            FailureKind::Unknown => ErrorCode::Unknown,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wrap a store failure for `key` into its API form
pub fn to_api_error(failure: &StoreFailure, key: &str) -> BlobApiError {
    let code = ErrorCode::from(failure.kind);
    let message = if failure.message.is_empty() {
        failure.kind.summary().to_string()
    } else {
        format!("{}: {}", failure.kind.summary(), failure.message)
    };
    BlobApiError::new(code.as_str(), message, key)
}
