//! Request handlers.

pub mod health;
pub mod thumbnails;
pub mod videos;

pub use health::*;
pub use thumbnails::*;
pub use videos::*;

use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;

use tubely_models::VideoId;

use crate::error::ApiError;

pub(crate) fn parse_video_id(raw: &str) -> Result<VideoId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request("Invalid video ID"))
}

/// Declared content type of a file part; a missing one is a client error.
pub(crate) fn part_content_type(field: &Field<'_>) -> Result<String, ApiError> {
    field
        .content_type()
        .map(str::trim)
        .filter(|ct| !ct.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request("Missing Content-Type for file part"))
}

pub(crate) fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::bad_request(err.body_text())
    }
}
