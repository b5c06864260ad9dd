//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::services::PublishError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Insufficient storage: {0}")]
    InsufficientStorage(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Storage error: {0}")]
    Storage(#[from] tubely_storage::StorageError),

    #[error("Firestore error: {0}")]
    Firestore(#[from] tubely_firestore::FirestoreError),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::InsufficientStorage(_) => StatusCode::INSUFFICIENT_STORAGE,
            ApiError::Internal(_) | ApiError::Storage(_) | ApiError::Firestore(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Conflict(_) => "conflict",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::UnsupportedMediaType(_) => "unsupported_media_type",
            ApiError::InsufficientStorage(_) => "insufficient_storage",
            ApiError::Internal(_) | ApiError::Storage(_) | ApiError::Firestore(_) => "internal",
        }
    }
}

impl From<PublishError> for ApiError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::PayloadTooLarge { .. } => Self::PayloadTooLarge(err.to_string()),
            PublishError::BodyRead(msg) => Self::BadRequest(msg),
            PublishError::Staging(e) => Self::InsufficientStorage(e.to_string()),
            PublishError::UnknownRecord(_) => Self::NotFound("Video not found".to_string()),
            PublishError::AccessDenied { .. } => {
                Self::Forbidden("You do not own this video".to_string())
            }
            PublishError::UnsupportedMediaType(ct) => Self::UnsupportedMediaType(ct),
            PublishError::Conflict(_) => Self::Conflict(err.to_string()),
            PublishError::Lookup(e) | PublishError::MetadataUpdate(e) => Self::Firestore(e),
            PublishError::Upload(e) | PublishError::KeyGeneration(e) => Self::Storage(e),
            PublishError::Transcode(_) => Self::Internal("Failed to process video".to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal causes are logged, never returned.
        let detail = if status.is_server_error() {
            error!(status = status.as_u16(), "Request failed: {}", self);
            match status {
                StatusCode::INSUFFICIENT_STORAGE => "Not enough space to stage the upload",
                _ => "An internal error occurred",
            }
            .to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            detail,
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}
