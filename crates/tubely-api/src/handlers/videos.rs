//! Video upload and lookup handlers.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use futures_util::StreamExt;
use tracing::info;

use tubely_models::{VideoId, VideoRecord};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::{multipart_error, parse_video_id, part_content_type};
use crate::services::{BodyError, VideoUpload};
use crate::state::AppState;

/// Multipart field holding the video file.
pub const VIDEO_FIELD: &str = "video";

/// Upload a video for an existing record and publish it.
///
/// POST /api/video_upload/:video_id
pub async fn upload_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    user: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<Json<VideoRecord>> {
    let video_id = parse_video_id(&video_id)?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }

        let content_type = part_content_type(&field)?;
        info!(
            video_id = %video_id,
            user_id = %user.user_id,
            content_type = %content_type,
            "Receiving video upload"
        );

        let upload = VideoUpload {
            video_id,
            user_id: user.user_id,
            content_type,
        };
        let body = field.map(|chunk| chunk.map_err(BodyError::from));
        let record = state.publisher.publish(upload, body).await?;
        return Ok(Json(record));
    }

    Err(ApiError::bad_request(format!(
        "Missing '{}' file part",
        VIDEO_FIELD
    )))
}

/// Get a video record owned by the caller.
///
/// GET /api/videos/:video_id
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    user: AuthUser,
) -> ApiResult<Json<VideoRecord>> {
    let video_id: VideoId = parse_video_id(&video_id)?;

    let record = state
        .videos
        .get_video(&video_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;

    if !record.is_owned_by(&user.user_id) {
        return Err(ApiError::forbidden("You do not own this video"));
    }

    Ok(Json(record))
}
