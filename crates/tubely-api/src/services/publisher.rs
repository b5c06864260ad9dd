//! Video publishing pipeline.
//!
//! One run takes an upload from request body to published record:
//!
//! ```text
//! Received -> Staged -> Validated -> Transcoded -> KeyAssigned -> Uploaded -> Published -> Done
//! ```
//!
//! Every run works inside its own [`Workspace`] directory. The staged upload
//! and the remuxed copy both live there, and the directory is removed when
//! the run ends however it ends. The metadata record is only written after
//! the object upload has succeeded.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use futures_util::{Stream, StreamExt};
use tempfile::TempDir;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, info_span, warn, Instrument};

use tubely_firestore::{FirestoreError, VideoStore};
use tubely_media::{MediaError, MediaToolkit};
use tubely_models::{extension_for, UserId, VideoId, VideoRecord};
use tubely_storage::{KeySource, ObjectStore, StorageError};

use crate::config::PublishConfig;
use crate::metrics;

/// Staged upload name. Never derived from the declared content type.
const STAGED_FILE_NAME: &str = "upload";

/// Pipeline states, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PublishState {
    Received,
    Staged,
    Validated,
    Transcoded,
    KeyAssigned,
    Uploaded,
    Published,
    Done,
}

impl PublishState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Staged => "staged",
            Self::Validated => "validated",
            Self::Transcoded => "transcoded",
            Self::KeyAssigned => "key_assigned",
            Self::Uploaded => "uploaded",
            Self::Published => "published",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for PublishState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reading the upload body.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("request body too large")]
    TooLarge,

    #[error("failed to read request body: {0}")]
    Read(String),
}

impl From<MultipartError> for BodyError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::TooLarge
        } else {
            Self::Read(err.body_text())
        }
    }
}

/// Why a run ended in the failed state.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("upload exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("failed to read upload: {0}")]
    BodyRead(String),

    #[error("failed to stage upload: {0}")]
    Staging(#[source] std::io::Error),

    #[error("video {0} not found")]
    UnknownRecord(VideoId),

    #[error("user {user} does not own video {video}")]
    AccessDenied { user: UserId, video: VideoId },

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("metadata lookup failed: {0}")]
    Lookup(#[source] FirestoreError),

    #[error("fast-start remux failed: {0}")]
    Transcode(#[source] MediaError),

    #[error("storage key generation failed: {0}")]
    KeyGeneration(#[source] StorageError),

    #[error("object upload failed: {0}")]
    Upload(#[source] StorageError),

    #[error("video {0} changed while the upload was processed")]
    Conflict(VideoId),

    #[error("metadata update failed: {0}")]
    MetadataUpdate(#[source] FirestoreError),
}

impl PublishError {
    /// The last state the run reached before failing.
    pub fn state(&self) -> PublishState {
        match self {
            Self::PayloadTooLarge { .. } | Self::BodyRead(_) | Self::Staging(_) => {
                PublishState::Received
            }
            Self::UnknownRecord(_)
            | Self::AccessDenied { .. }
            | Self::UnsupportedMediaType(_)
            | Self::Lookup(_) => PublishState::Staged,
            Self::Transcode(_) => PublishState::Validated,
            Self::KeyGeneration(_) => PublishState::Transcoded,
            Self::Upload(_) => PublishState::KeyAssigned,
            Self::Conflict(_) | Self::MetadataUpdate(_) => PublishState::Uploaded,
        }
    }
}

/// One upload as handed over by the HTTP layer.
#[derive(Debug, Clone)]
pub struct VideoUpload {
    pub video_id: VideoId,
    pub user_id: UserId,
    /// Declared content type of the file part.
    pub content_type: String,
}

/// Per-run scratch directory, removed on drop.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    async fn create(parent: &Path) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(parent).await?;
        let parent = parent.to_path_buf();
        let dir = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new().prefix("tubely-upload-").tempdir_in(parent)
        })
        .await
        .map_err(std::io::Error::other)??;
        Ok(Self { dir })
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the directory off the async runtime, logging failures.
    async fn release(self) {
        let path = self.dir.path().to_path_buf();
        match tokio::task::spawn_blocking(move || self.dir.close()).await {
            Ok(Ok(())) => debug!(path = %path.display(), "Released upload workspace"),
            Ok(Err(e)) => warn!(path = %path.display(), "Failed to remove upload workspace: {}", e),
            Err(e) => warn!(path = %path.display(), "Workspace cleanup task failed: {}", e),
        }
    }
}

/// Orchestrates publishing runs.
pub struct VideoPublisher {
    config: PublishConfig,
    videos: Arc<dyn VideoStore>,
    objects: Arc<dyn ObjectStore>,
    toolkit: Arc<dyn MediaToolkit>,
    keys: Arc<dyn KeySource>,
}

impl VideoPublisher {
    pub fn new(
        config: PublishConfig,
        videos: Arc<dyn VideoStore>,
        objects: Arc<dyn ObjectStore>,
        toolkit: Arc<dyn MediaToolkit>,
        keys: Arc<dyn KeySource>,
    ) -> Self {
        Self {
            config,
            videos,
            objects,
            toolkit,
            keys,
        }
    }

    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    /// Run the pipeline for one upload, returning the published record.
    pub async fn publish<S>(&self, upload: VideoUpload, body: S) -> Result<VideoRecord, PublishError>
    where
        S: Stream<Item = Result<Bytes, BodyError>> + Send,
    {
        let span = info_span!(
            "publish_video",
            video_id = %upload.video_id,
            user_id = %upload.user_id,
        );

        async move {
            let start = Instant::now();
            let result = match Workspace::create(&self.config.temp_dir).await {
                Ok(workspace) => {
                    let result = self.run(&upload, body, &workspace).await;
                    workspace.release().await;
                    result
                }
                Err(e) => Err(PublishError::Staging(e)),
            };

            let elapsed = start.elapsed().as_secs_f64();
            match &result {
                Ok(record) => {
                    debug!(state = %PublishState::Done, "Pipeline state");
                    info!(
                        video_url = record.video_url.as_deref().unwrap_or_default(),
                        duration_secs = elapsed,
                        "Video published"
                    );
                    metrics::record_publish_outcome(PublishState::Done.as_str(), "ok", elapsed);
                }
                Err(e) => {
                    let state = e.state();
                    if state >= PublishState::Validated {
                        error!(failed_in = %state, "Video publish failed: {}", e);
                    } else {
                        warn!(failed_in = %state, "Video publish rejected: {}", e);
                    }
                    metrics::record_publish_outcome(state.as_str(), "failed", elapsed);
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run<S>(
        &self,
        upload: &VideoUpload,
        body: S,
        workspace: &Workspace,
    ) -> Result<VideoRecord, PublishError>
    where
        S: Stream<Item = Result<Bytes, BodyError>> + Send,
    {
        let staged = workspace.path().join(STAGED_FILE_NAME);
        let size = self.stage(body, &staged).await?;
        debug!(state = %PublishState::Staged, bytes = size, "Pipeline state");

        let record = self.validate(upload).await?;
        debug!(state = %PublishState::Validated, "Pipeline state");

        let tool_start = Instant::now();
        let processed = self
            .toolkit
            .fast_start(&staged)
            .await
            .map_err(|e| {
                if let Some(stderr) = e.diagnostics() {
                    error!(stderr, "ffmpeg diagnostics");
                }
                PublishError::Transcode(e)
            })?;
        metrics::record_media_tool_duration("ffmpeg", tool_start.elapsed().as_secs_f64());
        debug!(state = %PublishState::Transcoded, path = %processed.display(), "Pipeline state");

        let metadata = self.aspect_metadata(&processed).await;

        let key = self
            .keys
            .generate(extension_for(&upload.content_type))
            .map_err(PublishError::KeyGeneration)?;
        debug!(state = %PublishState::KeyAssigned, key = %key, "Pipeline state");

        let upload_start = Instant::now();
        self.objects
            .put_file(key.as_str(), &processed, &upload.content_type, &metadata)
            .await
            .map_err(PublishError::Upload)?;
        metrics::record_upload_duration(upload_start.elapsed().as_secs_f64());
        debug!(state = %PublishState::Uploaded, bucket = self.objects.bucket(), key = %key, "Pipeline state");

        let url = self.objects.object_url(key.as_str());
        match self.videos.set_video_url(&record, &url).await {
            Ok(updated) => {
                debug!(state = %PublishState::Published, "Pipeline state");
                Ok(updated)
            }
            Err(e) => {
                error!(
                    bucket = self.objects.bucket(),
                    key = %key,
                    "Orphaned object: uploaded but the video record was not updated"
                );
                metrics::record_orphaned_object(self.objects.bucket());
                if e.is_precondition_failed() {
                    Err(PublishError::Conflict(upload.video_id))
                } else {
                    Err(PublishError::MetadataUpdate(e))
                }
            }
        }
    }

    /// Copy the body to `dest`, enforcing the size ceiling.
    async fn stage<S>(&self, body: S, dest: &Path) -> Result<u64, PublishError>
    where
        S: Stream<Item = Result<Bytes, BodyError>> + Send,
    {
        let limit = self.config.max_upload_bytes;
        let mut body = std::pin::pin!(body);
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(PublishError::Staging)?;
        let mut written: u64 = 0;

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| match e {
                BodyError::TooLarge => PublishError::PayloadTooLarge { limit },
                BodyError::Read(msg) => PublishError::BodyRead(msg),
            })?;
            written += chunk.len() as u64;
            if written > limit {
                return Err(PublishError::PayloadTooLarge { limit });
            }
            file.write_all(&chunk).await.map_err(PublishError::Staging)?;
        }

        file.flush().await.map_err(PublishError::Staging)?;
        Ok(written)
    }

    /// Record lookup, then ownership, then content type.
    async fn validate(&self, upload: &VideoUpload) -> Result<VideoRecord, PublishError> {
        let record = self
            .videos
            .get_video(&upload.video_id)
            .await
            .map_err(PublishError::Lookup)?
            .ok_or(PublishError::UnknownRecord(upload.video_id))?;

        if !record.is_owned_by(&upload.user_id) {
            return Err(PublishError::AccessDenied {
                user: upload.user_id,
                video: upload.video_id,
            });
        }

        if !self.config.accepts(&upload.content_type) {
            return Err(PublishError::UnsupportedMediaType(upload.content_type.clone()));
        }

        Ok(record)
    }

    /// Object metadata carrying the aspect category. Probe failures only log.
    async fn aspect_metadata(&self, path: &Path) -> Vec<(String, String)> {
        let start = Instant::now();
        match self.toolkit.probe_geometry(path).await {
            Ok(geometry) => {
                metrics::record_media_tool_duration("ffprobe", start.elapsed().as_secs_f64());
                let aspect = geometry.aspect();
                debug!(width = geometry.width, height = geometry.height, %aspect, "Probed geometry");
                vec![("aspect".to_string(), aspect.label().to_string())]
            }
            Err(e) => {
                warn!("Geometry probe failed, publishing without aspect: {}", e);
                if let Some(stderr) = e.diagnostics() {
                    error!(stderr, "ffprobe diagnostics");
                }
                Vec::new()
            }
        }
    }
}
