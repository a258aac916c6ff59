use std::env;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream as AwsByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::Utc;
use tracing::debug;

use crate::store::{BlobStore, FailureKind, ObjectMeta, StoreFailure};
use crate::{BlobError, BlobResult};

/// Longest presign lifetime S3 accepts
const MAX_PRESIGN_EXPIRY: Duration = Duration::from_secs(7 * 24 * 3600);

/// Connection settings for an S3-compatible backend
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint_url: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub force_path_style: bool,
    pub presign_expiry: Duration,
}

impl S3Config {
    pub fn new<S: Into<String>>(bucket: S) -> Self {
        Self {
            bucket: bucket.into(),
            region: "us-east-1".to_string(),
            endpoint_url: None,
            access_key_id: None,
            secret_access_key: None,
            force_path_style: false,
            presign_expiry: Duration::from_secs(3600),
        }
    }

    /// Read `BLOB_S3_*` variables. Only the bucket is required; credentials
    /// fall back to the default AWS provider chain.
    pub fn from_env() -> BlobResult<Self> {
        fn optional(key: &str) -> Option<String> {
            env::var(key).ok().filter(|v| !v.trim().is_empty())
        }

        let bucket = optional("BLOB_S3_BUCKET")
            .ok_or_else(|| BlobError::config("BLOB_S3_BUCKET environment variable required"))?;

        let mut config = Self::new(bucket);
        if let Some(region) = optional("BLOB_S3_REGION") {
            config.region = region;
        }
        config.endpoint_url = optional("BLOB_S3_ENDPOINT_URL");
        config.access_key_id = optional("BLOB_S3_ACCESS_KEY_ID");
        config.secret_access_key = optional("BLOB_S3_SECRET_ACCESS_KEY");
        // Custom endpoints (MinIO, RustFS, ...) usually need path-style addressing
        config.force_path_style = optional("BLOB_S3_FORCE_PATH_STYLE")
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.endpoint_url.is_some());
        if let Some(secs) = optional("BLOB_S3_PRESIGN_EXPIRY_SECS").and_then(|v| v.parse().ok()) {
            config = config.with_presign_expiry(Duration::from_secs(secs));
        }
        Ok(config)
    }

    pub fn with_endpoint<S: Into<String>>(mut self, endpoint_url: S) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self.force_path_style = true;
        self
    }

    pub fn with_region<S: Into<String>>(mut self, region: S) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_credentials<A: Into<String>, S: Into<String>>(mut self, access_key_id: A, secret_access_key: S) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    /// Clamped to 1 second ..= 7 days
    pub fn with_presign_expiry(mut self, expiry: Duration) -> Self {
        self.presign_expiry = expiry.clamp(Duration::from_secs(1), MAX_PRESIGN_EXPIRY);
        self
    }
}

/// Object store backed by any S3-compatible service
#[derive(Clone)]
pub struct S3CompatibleStore {
    client: Client,
    bucket: String,
    presign_expiry: Duration,
}

impl S3CompatibleStore {
    pub async fn new(config: S3Config) -> Self {
        let client = Self::create_client(&config).await;
        Self {
            client,
            bucket: config.bucket,
            presign_expiry: config.presign_expiry,
        }
    }

    pub async fn from_env() -> BlobResult<Self> {
        Ok(Self::new(S3Config::from_env()?).await)
    }

    /// Use an already configured SDK client
    pub fn from_client<S: Into<String>>(client: Client, bucket: S, presign_expiry: Duration) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            presign_expiry,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn create_client(config: &S3Config) -> Client {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let (Some(access_key_id), Some(secret_access_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let credentials = Credentials::new(
                access_key_id.clone(),
                secret_access_key.clone(),
                None,
                None,
                "blob-gateway",
            );
            loader = loader.credentials_provider(credentials);
        }
        if let Some(endpoint_url) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint_url.clone());
        }

        let aws_config = loader.load().await;
        Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(config.force_path_style)
                .build(),
        )
    }

    /// Existence check so presign and delete report NOT_FOUND the same way
    /// the other stores do (S3 deletes succeed silently on missing keys).
    async fn head(&self, key: &str) -> Result<(), StoreFailure> {
        self.client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(map_sdk_error)?;
        Ok(())
    }
}

#[async_trait]
impl BlobStore for S3CompatibleStore {
    async fn upload_object(&self, key: &str, data: Bytes) -> Result<ObjectMeta, StoreFailure> {
        let size = data.len() as u64;
        let output = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(AwsByteStream::from(data))
            .send()
            .await
            .map_err(map_sdk_error)?;

        debug!(bucket = %self.bucket, key, size, "S3 put successful");

        Ok(ObjectMeta {
            // "null" is what S3 reports for unversioned buckets
            version: output.version_id().unwrap_or("null").to_string(),
            etag: output.e_tag().unwrap_or_default().to_string(),
            size,
            last_modified: Utc::now(),
        })
    }

    async fn presign(&self, key: &str) -> Result<String, StoreFailure> {
        self.head(key).await?;

        let presigning = PresigningConfig::expires_in(self.presign_expiry)
            .map_err(|e| StoreFailure::unknown(e.to_string()))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(map_sdk_error)?;

        Ok(request.uri().to_string())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StoreFailure> {
        self.head(key).await?;

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(map_sdk_error)?;

        debug!(bucket = %self.bucket, key, "S3 delete successful");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "s3"
    }
}

fn map_sdk_error<E>(err: SdkError<E, HttpResponse>) -> StoreFailure
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let kind = match &err {
        SdkError::TimeoutError(_) => FailureKind::Timeout,
        SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => FailureKind::BackendUnavailable,
        // HEAD error responses carry no body, hence no code; use the status
        SdkError::ServiceError(service) => match kind_from_code(service.err().code()) {
            FailureKind::Unknown => kind_from_status(service.raw().status().as_u16()),
            kind => kind,
        },
        _ => FailureKind::Unknown,
    };
    StoreFailure::new(kind, DisplayErrorContext(&err).to_string())
}

/// Map an S3 error code to a failure kind
fn kind_from_code(code: Option<&str>) -> FailureKind {
    match code {
        Some("NoSuchKey" | "NotFound" | "NoSuchBucket" | "NoSuchVersion") => FailureKind::NotFound,
        Some("AccessDenied" | "Forbidden" | "AllAccessDisabled" | "InvalidAccessKeyId" | "SignatureDoesNotMatch") => {
            FailureKind::AccessDenied
        }
        Some("KeyTooLongError" | "InvalidKey" | "InvalidObjectName") => FailureKind::InvalidKey,
        Some("SlowDown" | "ServiceUnavailable" | "InternalError" | "RequestTimeout") => {
            FailureKind::BackendUnavailable
        }
        Some("BadDigest" | "InvalidDigest" | "XAmzContentSHA256Mismatch") => FailureKind::ChecksumMismatch,
        _ => FailureKind::Unknown,
    }
}

/// Map an HTTP status to a failure kind when no service code is available
fn kind_from_status(status: u16) -> FailureKind {
    match status {
        401 | 403 => FailureKind::AccessDenied,
        404 => FailureKind::NotFound,
        408 | 429 | 500..=599 => FailureKind::BackendUnavailable,
        _ => FailureKind::Unknown,
    }
}
