use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use validator::Validate;

/// Stream of bytes for upload bodies
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// A key and the presigned URL generated for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobUrl {
    pub key: String,
    pub url: String,
}

impl BlobUrl {
    pub fn new<K: Into<String>, U: Into<String>>(key: K, url: U) -> Self {
        Self {
            key: key.into(),
            url: url.into(),
        }
    }
}

/// Per-key failure as reported to API consumers.
///
/// `code` is stable and safe to branch on. `message` is diagnostic only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("blob api error: code={code}, message={message}, key={key}")]
pub struct BlobApiError {
    pub code: String,
    pub message: String,
    pub key: String,
}

impl BlobApiError {
    pub fn new<C, M, K>(code: C, message: M, key: K) -> Self
    where
        C: Into<String>,
        M: Into<String>,
        K: Into<String>,
    {
        Self {
            code: code.into(),
            message: message.into(),
            key: key.into(),
        }
    }
}

/// Single-object upload. Sent as multipart form fields next to the file part.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UploadRequest {
    #[validate(length(min = 1, message = "key is required"))]
    pub key: String,

    /// Base64 SHA-256 of the body
    #[serde(default)]
    pub sha256: Option<String>,

    /// Base64 big-endian CRC32 of the body
    #[serde(default)]
    pub crc32: Option<String>,
}

impl UploadRequest {
    pub fn new<K: Into<String>>(key: K) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_sha256<S: Into<String>>(mut self, checksum: S) -> Self {
        self.sha256 = Some(checksum.into());
        self
    }

    pub fn with_crc32<S: Into<String>>(mut self, checksum: S) -> Self {
        self.crc32 = Some(checksum.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub key: String,
    pub version: String,
    pub etag: String,
    pub size: i64,
    #[serde(rename = "lastModified")]
    pub last_modified: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PresignUrlRequest {
    #[validate(length(min = 1, message = "keys must contain at least one key"))]
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresignUrlResponse {
    pub urls: Vec<BlobUrl>,
    pub errors: Vec<BlobApiError>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DeleteRequest {
    #[validate(length(min = 1, message = "keys must contain at least one key"))]
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: Vec<String>,
    pub errors: Vec<BlobApiError>,
}
