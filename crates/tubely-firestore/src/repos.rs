//! Video metadata repository.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use tubely_models::{UserId, VideoId, VideoRecord};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::record_precondition_failure;
use crate::types::{Document, ToFirestoreValue, Value};

/// Collection holding one document per video, keyed by video id.
pub const VIDEOS_COLLECTION: &str = "videos";

/// Metadata store boundary.
///
/// Updates take the record as previously read; implementations reject the
/// write with [`FirestoreError::PreconditionFailed`] if the stored record
/// changed since (optimistic concurrency on `VideoRecord::version`).
#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn get_video(&self, id: &VideoId) -> FirestoreResult<Option<VideoRecord>>;

    async fn set_video_url(&self, record: &VideoRecord, url: &str) -> FirestoreResult<VideoRecord>;

    async fn set_thumbnail_url(
        &self,
        record: &VideoRecord,
        url: &str,
    ) -> FirestoreResult<VideoRecord>;

    async fn health_check(&self) -> FirestoreResult<()>;
}

/// Firestore-backed [`VideoStore`].
#[derive(Clone)]
pub struct VideoRepository {
    client: FirestoreClient,
}

impl VideoRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    async fn set_url_field(
        &self,
        record: &VideoRecord,
        field: &'static str,
        url: &str,
    ) -> FirestoreResult<VideoRecord> {
        let now = Utc::now();
        let mut fields = HashMap::new();
        fields.insert(field.to_string(), url.to_firestore_value());
        fields.insert("updated_at".to_string(), now.to_firestore_value());

        let doc_id = record.id.to_string();
        let result = self
            .client
            .update_document(
                VIDEOS_COLLECTION,
                &doc_id,
                fields,
                &[field, "updated_at"],
                record.version.as_deref(),
            )
            .await;

        let doc = match result {
            Ok(doc) => doc,
            Err(e) if e.is_precondition_failed() => {
                record_precondition_failure(VIDEOS_COLLECTION);
                warn!(video_id = %record.id, field, "Video changed since it was read");
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        info!(video_id = %record.id, field, "Updated video record");

        // PATCH echoes the whole document; fall back to applying the change
        // locally if the echo is incomplete.
        match document_to_video(&doc, &record.id) {
            Ok(updated) => Ok(updated),
            Err(_) => {
                let mut updated = record.clone();
                match field {
                    "video_url" => updated.video_url = Some(url.to_string()),
                    _ => updated.thumbnail_url = Some(url.to_string()),
                }
                updated.updated_at = now;
                updated.version = doc.update_time;
                Ok(updated)
            }
        }
    }
}

#[async_trait]
impl VideoStore for VideoRepository {
    async fn get_video(&self, id: &VideoId) -> FirestoreResult<Option<VideoRecord>> {
        let doc = self
            .client
            .get_document(VIDEOS_COLLECTION, &id.to_string())
            .await?;

        doc.map(|d| document_to_video(&d, id)).transpose()
    }

    async fn set_video_url(&self, record: &VideoRecord, url: &str) -> FirestoreResult<VideoRecord> {
        self.set_url_field(record, "video_url", url).await
    }

    async fn set_thumbnail_url(
        &self,
        record: &VideoRecord,
        url: &str,
    ) -> FirestoreResult<VideoRecord> {
        self.set_url_field(record, "thumbnail_url", url).await
    }

    async fn health_check(&self) -> FirestoreResult<()> {
        self.client.health_check().await
    }
}

/// Convert a Firestore document into a [`VideoRecord`].
pub fn document_to_video(doc: &Document, id: &VideoId) -> FirestoreResult<VideoRecord> {
    let user_id = doc
        .get::<String>("user_id")
        .and_then(|s| s.parse::<UserId>().ok())
        .ok_or_else(|| {
            FirestoreError::invalid_document(format!("video {} has no valid user_id", id))
        })?;

    let created_at = doc
        .get::<DateTime<Utc>>("created_at")
        .ok_or_else(|| FirestoreError::invalid_document(format!("video {} has no created_at", id)))?;

    Ok(VideoRecord {
        id: *id,
        user_id,
        title: doc.get("title").unwrap_or_default(),
        description: doc.get("description").unwrap_or_default(),
        thumbnail_url: doc.get("thumbnail_url"),
        video_url: doc.get("video_url"),
        created_at,
        updated_at: doc.get("updated_at").unwrap_or(created_at),
        version: doc.update_time.clone(),
    })
}

/// Convert a [`VideoRecord`] into Firestore fields.
pub fn video_to_fields(video: &VideoRecord) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("user_id".to_string(), video.user_id.to_string().to_firestore_value());
    fields.insert("title".to_string(), video.title.to_firestore_value());
    fields.insert("description".to_string(), video.description.to_firestore_value());
    fields.insert("thumbnail_url".to_string(), video.thumbnail_url.to_firestore_value());
    fields.insert("video_url".to_string(), video.video_url.to_firestore_value());
    fields.insert("created_at".to_string(), video.created_at.to_firestore_value());
    fields.insert("updated_at".to_string(), video.updated_at.to_firestore_value());
    fields
}
