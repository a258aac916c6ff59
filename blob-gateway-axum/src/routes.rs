use axum::{
    extract::multipart::MultipartRejection,
    extract::DefaultBodyLimit,
    extract::rejection::JsonRejection,
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use blob_gateway::key::MAX_KEY_BYTES;
use blob_gateway::{
    BlobConfig, ByteStream, DeleteRequest, DeleteResponse, PresignUrlRequest, PresignUrlResponse,
    UploadRequest, UploadResponse,
};
use bytes::Bytes;
use futures::stream;

use crate::{GatewayError, GatewayState};

/// Room for multipart boundaries and text fields on top of the file part
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

/// Per-key JSON framing: quotes, comma, escapes
const JSON_KEY_OVERHEAD: usize = 16;

/// axum's own default, kept as the floor for batch bodies
const MIN_BATCH_BODY: usize = 2 * 1024 * 1024;

/// Largest multipart body `/upload` buffers
pub fn upload_body_limit(config: &BlobConfig) -> usize {
    let max = config.max_blob_bytes.saturating_add(MULTIPART_OVERHEAD);
    usize::try_from(max).unwrap_or(usize::MAX)
}

/// Largest JSON body a presign or delete batch may send
pub fn batch_body_limit(config: &BlobConfig) -> usize {
    config
        .max_batch_keys
        .saturating_mul(MAX_KEY_BYTES + JSON_KEY_OVERHEAD)
        .max(MIN_BATCH_BODY)
}

/// Routes mounted under `/blob`
pub fn blob_router(state: GatewayState) -> Router<()> {
    let config = state.blobs.config();
    let upload_limit = DefaultBodyLimit::max(upload_body_limit(config));
    let batch_limit = DefaultBodyLimit::max(batch_body_limit(config));

    Router::new()
        .route("/upload", post(upload).layer(upload_limit))
        .route("/presign", post(presign).layer(batch_limit))
        .route("/delete", post(delete).layer(batch_limit))
        .with_state(state)
}

async fn upload(
    State(state): State<GatewayState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, GatewayError> {
    let mut multipart = multipart?;
    let mut request = UploadRequest::default();
    let mut file: Option<Vec<Bytes>> = None;

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "key" => request.key = field.text().await?,
            "sha256" => request.sha256 = Some(field.text().await?),
            "crc32" => request.crc32 = Some(field.text().await?),
            "file" => {
                if file.is_some() {
                    return Err(GatewayError::bad_request("multipart part `file` given more than once"));
                }
                let mut chunks = Vec::new();
                while let Some(chunk) = field.chunk().await? {
                    chunks.push(chunk);
                }
                file = Some(chunks);
            }
            other => tracing::debug!(field = other, "ignoring multipart field"),
        }
    }

    let chunks = file.ok_or_else(|| GatewayError::bad_request("multipart part `file` is required"))?;
    let body: ByteStream = Box::pin(stream::iter(chunks.into_iter().map(Ok::<_, std::io::Error>)));

    let res = state.blobs.upload(request, body).await?;
    Ok(Json(res))
}

async fn presign(
    State(state): State<GatewayState>,
    payload: Result<Json<PresignUrlRequest>, JsonRejection>,
) -> Result<Json<PresignUrlResponse>, GatewayError> {
    let Json(request) = payload?;
    let res = state.blobs.presign_urls_with_cancel(request, &state.shutdown).await?;
    Ok(Json(res))
}

async fn delete(
    State(state): State<GatewayState>,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<DeleteResponse>, GatewayError> {
    let Json(request) = payload?;
    let res = state.blobs.delete_with_cancel(request, &state.shutdown).await?;
    Ok(Json(res))
}
