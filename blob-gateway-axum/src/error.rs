use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use blob_gateway::{BlobError, ErrorCode};
use serde::Serialize;

/// Body of a whole-request error
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

/// Handler error. Batch endpoints only produce it for whole-request failures;
/// per-key failures travel inside the 200 response.
#[derive(Debug)]
pub enum GatewayError {
    Blob(BlobError),
    /// Request rejected by an extractor before reaching the adapter
    Rejected { status: StatusCode, message: String },
}

impl GatewayError {
    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::Rejected {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<BlobError> for GatewayError {
    fn from(e: BlobError) -> Self {
        Self::Blob(e)
    }
}

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        // Syntax and data errors alike are reported as a bad request
        let status = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        Self::Rejected {
            status,
            message: rejection.body_text(),
        }
    }
}

impl From<MultipartRejection> for GatewayError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<MultipartError> for GatewayError {
    fn from(e: MultipartError) -> Self {
        let status = match e.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        Self::Rejected {
            status,
            message: e.body_text(),
        }
    }
}

fn request_error(status: StatusCode, message: String) -> Response {
    let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "PAYLOAD_TOO_LARGE"
    } else {
        "INVALID_REQUEST"
    };
    (status, Json(ErrorBody { code, message })).into_response()
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::Rejected { status, message } => request_error(status, message),
            GatewayError::Blob(err) => match err {
                BlobError::Validation { message } => request_error(StatusCode::BAD_REQUEST, message),
                err @ BlobError::PayloadTooLarge { .. } => {
                    request_error(StatusCode::PAYLOAD_TOO_LARGE, err.to_string())
                }
                BlobError::Io { source } => request_error(
                    StatusCode::BAD_REQUEST,
                    format!("failed to read request body: {source}"),
                ),
                BlobError::Object(api) => {
                    let status = ErrorCode::parse(&api.code)
                        .and_then(|code| StatusCode::from_u16(code.status_code()).ok())
                        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                    (status, Json(api)).into_response()
                }
                err @ BlobError::Config { .. } => {
                    tracing::error!(error = %err, "gateway misconfigured");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(ErrorBody {
                            code: "UNKNOWN",
                            message: "internal error".to_string(),
                        }),
                    )
                        .into_response()
                }
            },
        }
    }
}
