//! Application state.

use std::sync::Arc;

use tracing::warn;

use tubely_firestore::{FirestoreClient, FirestoreConfig, VideoRepository, VideoStore};
use tubely_media::{FfmpegToolkit, MediaToolkit};
use tubely_storage::{KeySource, ObjectStore, RandomKeySource, S3Client};

use crate::config::{ApiConfig, PublishConfig};
use crate::services::{ThumbnailService, VideoPublisher};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub videos: Arc<dyn VideoStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub publisher: Arc<VideoPublisher>,
    pub thumbnails: Arc<ThumbnailService>,
}

impl AppState {
    /// Create application state backed by Firestore, S3 and the ffmpeg CLI.
    pub async fn new(
        config: ApiConfig,
        publish: PublishConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let firestore = FirestoreClient::new(FirestoreConfig::from_env()?).await?;
        let storage = S3Client::from_env().await?;

        let toolkit = FfmpegToolkit::new(&publish.ffmpeg_path, &publish.ffprobe_path)
            .with_timeout(publish.tool_timeout_secs);
        if let Err(e) = toolkit.check_available() {
            warn!("Media tools unavailable, video uploads will fail: {}", e);
        }

        Ok(Self::from_parts(
            config,
            publish,
            Arc::new(VideoRepository::new(firestore)),
            Arc::new(storage),
            Arc::new(toolkit),
            Arc::new(RandomKeySource),
        ))
    }

    /// Assemble state from explicit collaborators.
    pub fn from_parts(
        config: ApiConfig,
        publish: PublishConfig,
        videos: Arc<dyn VideoStore>,
        objects: Arc<dyn ObjectStore>,
        toolkit: Arc<dyn MediaToolkit>,
        keys: Arc<dyn KeySource>,
    ) -> Self {
        let publisher = VideoPublisher::new(
            publish,
            Arc::clone(&videos),
            Arc::clone(&objects),
            toolkit,
            Arc::clone(&keys),
        );
        let thumbnails = ThumbnailService::new(
            config.assets_root.clone(),
            config.base_url.clone(),
            Arc::clone(&videos),
            keys,
        );

        Self {
            config: Arc::new(config),
            videos,
            objects,
            publisher: Arc::new(publisher),
            thumbnails: Arc::new(thumbnails),
        }
    }
}
