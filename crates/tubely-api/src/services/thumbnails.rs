//! Thumbnail intake: store the image under the assets root and point the
//! record at it.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use tubely_firestore::VideoStore;
use tubely_models::{extension_for, MediaKind, VideoRecord};
use tubely_storage::KeySource;

use crate::error::{ApiError, ApiResult};
use crate::metrics;

pub struct ThumbnailService {
    assets_root: PathBuf,
    base_url: String,
    videos: Arc<dyn VideoStore>,
    keys: Arc<dyn KeySource>,
}

impl ThumbnailService {
    pub fn new(
        assets_root: impl Into<PathBuf>,
        base_url: impl Into<String>,
        videos: Arc<dyn VideoStore>,
        keys: Arc<dyn KeySource>,
    ) -> Self {
        Self {
            assets_root: assets_root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            videos,
            keys,
        }
    }

    /// Public URL of an asset file.
    pub fn asset_url(&self, name: &str) -> String {
        format!("{}/assets/{}", self.base_url, name)
    }

    /// Persist `data` and set the record's `thumbnail_url`.
    ///
    /// The caller has already checked ownership. If the record update fails
    /// the written file is removed again.
    pub async fn store(
        &self,
        record: &VideoRecord,
        content_type: &str,
        data: &[u8],
    ) -> ApiResult<VideoRecord> {
        if !MediaKind::Thumbnail.accepts(content_type) {
            return Err(ApiError::UnsupportedMediaType(content_type.to_string()));
        }

        let key = self.keys.generate(extension_for(content_type))?;
        let path = self.assets_root.join(key.as_str());

        tokio::fs::create_dir_all(&self.assets_root)
            .await
            .map_err(|e| ApiError::InsufficientStorage(e.to_string()))?;
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| ApiError::InsufficientStorage(e.to_string()))?;

        let url = self.asset_url(key.as_str());
        match self.videos.set_thumbnail_url(record, &url).await {
            Ok(updated) => {
                info!(video_id = %record.id, bytes = data.len(), "Stored thumbnail");
                metrics::record_thumbnail_stored(content_type);
                Ok(updated)
            }
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&path).await {
                    warn!(path = %path.display(), "Failed to remove thumbnail: {}", rm);
                }
                if e.is_precondition_failed() {
                    Err(ApiError::Conflict(format!(
                        "video {} changed while the thumbnail was stored",
                        record.id
                    )))
                } else {
                    Err(e.into())
                }
            }
        }
    }
}
