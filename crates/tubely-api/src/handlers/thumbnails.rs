//! Thumbnail upload handler.

use axum::extract::{Multipart, Path, State};
use axum::Json;

use tubely_models::VideoRecord;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::{multipart_error, parse_video_id, part_content_type};
use crate::state::AppState;

/// Multipart field holding the image.
pub const THUMBNAIL_FIELD: &str = "thumbnail";

/// Upload a thumbnail image for a video.
///
/// POST /api/thumbnail_upload/:video_id
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    user: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<Json<VideoRecord>> {
    let video_id = parse_video_id(&video_id)?;

    let record = state
        .videos
        .get_video(&video_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;
    if !record.is_owned_by(&user.user_id) {
        return Err(ApiError::forbidden("You do not own this video"));
    }

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(THUMBNAIL_FIELD) {
            continue;
        }

        let content_type = part_content_type(&field)?;
        let data = field.bytes().await.map_err(multipart_error)?;
        let updated = state.thumbnails.store(&record, &content_type, &data).await?;
        return Ok(Json(updated));
    }

    Err(ApiError::bad_request(format!(
        "Missing '{}' file part",
        THUMBNAIL_FIELD
    )))
}
