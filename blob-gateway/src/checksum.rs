//! Optional upload integrity checks.
//!
//! Checksums use the encodings S3 uses for its `x-amz-checksum-*` headers:
//! base64 of the SHA-256 digest, base64 of the big-endian CRC32.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::store::StoreFailure;
use crate::types::UploadRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    Sha256,
    Crc32,
}

impl ChecksumAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Sha256 => "sha256",
            ChecksumAlgorithm::Crc32 => "crc32",
        }
    }

    /// Encoded checksum of `data`
    pub fn compute(&self, data: &[u8]) -> String {
        match self {
            ChecksumAlgorithm::Sha256 => STANDARD.encode(Sha256::digest(data)),
            ChecksumAlgorithm::Crc32 => STANDARD.encode(crc32fast::hash(data).to_be_bytes()),
        }
    }
}

/// Check every checksum supplied with `request` against `data`.
///
/// Each supplied checksum is verified independently; the first mismatch is
/// reported.
pub fn verify(request: &UploadRequest, data: &[u8]) -> Result<(), StoreFailure> {
    let expected = [
        (ChecksumAlgorithm::Sha256, request.sha256.as_deref()),
        (ChecksumAlgorithm::Crc32, request.crc32.as_deref()),
    ];

    for (algorithm, expected) in expected {
        let Some(expected) = expected.map(str::trim).filter(|v| !v.is_empty()) else {
            continue;
        };
        let actual = algorithm.compute(data);
        if actual != expected {
            return Err(StoreFailure::checksum_mismatch(format!(
                "{} expected {} but content hashes to {}",
                algorithm.as_str(),
                expected,
                actual
            )));
        }
    }
    Ok(())
}
