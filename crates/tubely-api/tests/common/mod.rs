//! Shared fixtures for API integration tests: in-memory collaborators and
//! request builders.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use chrono::Utc;
use tempfile::TempDir;

use tubely_api::{create_router, issue_access_token, ApiConfig, AppState, PublishConfig};
use tubely_firestore::{FirestoreError, FirestoreResult, VideoStore};
use tubely_media::{faststart_output_path, Geometry, MediaError, MediaResult, MediaToolkit};
use tubely_models::{UserId, VideoId, VideoRecord};
use tubely_storage::{KeySource, ObjectStore, RandomKeySource, StorageError, StorageResult};

pub const SECRET: &str = "integration-secret";
pub const BUCKET: &str = "tubely-test";
pub const BOUNDARY: &str = "tubely-test-boundary";

/// Metadata store with the same optimistic versioning as Firestore.
#[derive(Default)]
pub struct MemoryVideoStore {
    records: Mutex<HashMap<VideoId, VideoRecord>>,
    revision: AtomicU64,
    fail_updates: AtomicBool,
}

impl MemoryVideoStore {
    fn next_version(&self) -> String {
        format!("rev-{}", self.revision.fetch_add(1, Ordering::SeqCst))
    }

    pub fn insert(&self, mut record: VideoRecord) -> VideoRecord {
        record.version = Some(self.next_version());
        self.records.lock().unwrap().insert(record.id, record.clone());
        record
    }

    pub fn get(&self, id: &VideoId) -> Option<VideoRecord> {
        self.records.lock().unwrap().get(id).cloned()
    }

    /// Make every later update fail as if Firestore were unavailable.
    pub fn fail_updates(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }

    fn update(
        &self,
        record: &VideoRecord,
        apply: impl FnOnce(&mut VideoRecord),
    ) -> FirestoreResult<VideoRecord> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(FirestoreError::ServerError(503, "injected update failure".to_string()));
        }
        let mut records = self.records.lock().unwrap();
        let current = records
            .get_mut(&record.id)
            .ok_or_else(|| FirestoreError::not_found(record.id.to_string()))?;
        if current.version != record.version {
            return Err(FirestoreError::PreconditionFailed(format!(
                "video {} is at {:?}, update based on {:?}",
                record.id, current.version, record.version
            )));
        }
        apply(current);
        current.updated_at = Utc::now();
        current.version = Some(self.next_version());
        Ok(current.clone())
    }
}

#[async_trait]
impl VideoStore for MemoryVideoStore {
    async fn get_video(&self, id: &VideoId) -> FirestoreResult<Option<VideoRecord>> {
        Ok(self.get(id))
    }

    async fn set_video_url(&self, record: &VideoRecord, url: &str) -> FirestoreResult<VideoRecord> {
        self.update(record, |r| r.video_url = Some(url.to_string()))
    }

    async fn set_thumbnail_url(
        &self,
        record: &VideoRecord,
        url: &str,
    ) -> FirestoreResult<VideoRecord> {
        self.update(record, |r| r.thumbnail_url = Some(url.to_string()))
    }

    async fn health_check(&self) -> FirestoreResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
    pub metadata: Vec<(String, String)>,
}

/// Object store keeping uploads in memory.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    pub fail_uploads: bool,
}

impl MemoryObjectStore {
    pub fn failing() -> Self {
        Self {
            fail_uploads: true,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    /// Key of the object a published URL points at.
    pub fn key_for_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(&format!("https://{}.cdn.test/", BUCKET))
            .map(str::to_string)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn bucket(&self) -> &str {
        BUCKET
    }

    async fn put_file(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
        metadata: &[(String, String)],
    ) -> StorageResult<()> {
        if self.fail_uploads {
            return Err(StorageError::upload_failed("injected upload failure"));
        }
        let data = tokio::fs::read(path).await?;
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                metadata: metadata.to_vec(),
            },
        );
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        format!("https://{}.cdn.test/{}", BUCKET, key)
    }

    async fn check_connectivity(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Toolkit that "remuxes" by copying and reports a fixed geometry.
pub struct FakeToolkit {
    pub geometry: Geometry,
    pub fail_remux: bool,
    pub fail_geometry: bool,
    pub remux_delay: Option<Duration>,
}

impl FakeToolkit {
    pub fn wide() -> Self {
        Self {
            geometry: Geometry {
                width: 1920,
                height: 1080,
            },
            fail_remux: false,
            fail_geometry: false,
            remux_delay: None,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_remux: true,
            ..Self::wide()
        }
    }
}

#[async_trait]
impl MediaToolkit for FakeToolkit {
    async fn fast_start(&self, input: &Path) -> MediaResult<PathBuf> {
        if let Some(delay) = self.remux_delay {
            tokio::time::sleep(delay).await;
        }
        let output = faststart_output_path(input);
        if self.fail_remux {
            // Leave a partial output behind like a crashed ffmpeg would.
            tokio::fs::write(&output, b"partial").await?;
            return Err(MediaError::remux_failed(
                "ffmpeg exited with status 1",
                Some("moov atom not found".to_string()),
                Some(1),
            ));
        }
        tokio::fs::copy(input, &output).await?;
        Ok(output)
    }

    async fn probe_geometry(&self, _path: &Path) -> MediaResult<Geometry> {
        if self.fail_geometry {
            return Err(MediaError::NoUsableVideoStream);
        }
        Ok(self.geometry)
    }
}

pub struct TestApp {
    pub router: Router,
    pub videos: Arc<MemoryVideoStore>,
    pub objects: Arc<MemoryObjectStore>,
    pub temp_dir: TempDir,
    pub assets_dir: TempDir,
    pub owner: UserId,
    pub video: VideoRecord,
}

pub struct TestAppBuilder {
    toolkit: Arc<dyn MediaToolkit>,
    keys: Arc<dyn KeySource>,
    objects: Arc<MemoryObjectStore>,
    max_upload_bytes: u64,
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self {
            toolkit: Arc::new(FakeToolkit::wide()),
            keys: Arc::new(RandomKeySource),
            objects: Arc::new(MemoryObjectStore::default()),
            max_upload_bytes: 1 << 20,
        }
    }
}

impl TestAppBuilder {
    pub fn toolkit(mut self, toolkit: Arc<dyn MediaToolkit>) -> Self {
        self.toolkit = toolkit;
        self
    }

    pub fn keys(mut self, keys: Arc<dyn KeySource>) -> Self {
        self.keys = keys;
        self
    }

    pub fn objects(mut self, objects: MemoryObjectStore) -> Self {
        self.objects = Arc::new(objects);
        self
    }

    pub fn max_upload_bytes(mut self, bytes: u64) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    pub fn build(self) -> TestApp {
        let temp_dir = tempfile::tempdir().unwrap();
        let assets_dir = tempfile::tempdir().unwrap();

        let videos = Arc::new(MemoryVideoStore::default());
        let owner = UserId::new();
        let video = videos.insert(
            VideoRecord::new(VideoId::new(), owner, "Boots").with_description("Leather boots"),
        );

        let config = ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 1000,
            request_timeout: Duration::from_secs(30),
            environment: "test".to_string(),
            jwt_secret: SECRET.to_string(),
            base_url: "http://localhost:8091".to_string(),
            assets_root: assets_dir.path().to_path_buf(),
            max_thumbnail_bytes: 64 * 1024,
        };
        let publish = PublishConfig {
            temp_dir: temp_dir.path().to_path_buf(),
            max_upload_bytes: self.max_upload_bytes,
            ..PublishConfig::default()
        };

        let state = AppState::from_parts(
            config,
            publish,
            videos.clone(),
            self.objects.clone(),
            self.toolkit,
            self.keys,
        );

        TestApp {
            router: create_router(state, None),
            videos,
            objects: self.objects,
            temp_dir,
            assets_dir,
            owner,
            video,
        }
    }
}

impl TestApp {
    pub fn builder() -> TestAppBuilder {
        TestAppBuilder::default()
    }

    /// Entries left in the staging directory.
    pub fn leftover_temp_files(&self) -> usize {
        std::fs::read_dir(self.temp_dir.path()).unwrap().count()
    }
}

pub fn bearer(user: UserId) -> String {
    let token = issue_access_token(user, SECRET, Duration::from_secs(300)).unwrap();
    format!("Bearer {}", token)
}

/// A multipart body with one file part.
pub fn multipart_body(field: &str, content_type: Option<&str>, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"upload.bin\"\r\n",
            field
        )
        .as_bytes(),
    );
    if let Some(ct) = content_type {
        body.extend_from_slice(format!("Content-Type: {}\r\n", ct).as_bytes());
    }
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(
    path: &str,
    auth: Option<&str>,
    field: &str,
    content_type: Option<&str>,
    data: &[u8],
) -> Request<Body> {
    let body = multipart_body(field, content_type, data);
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header(header::CONTENT_LENGTH, body.len());
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn video_upload(
    video_id: impl std::fmt::Display,
    auth: Option<&str>,
    content_type: Option<&str>,
    data: &[u8],
) -> Request<Body> {
    upload_request(
        &format!("/api/video_upload/{}", video_id),
        auth,
        "video",
        content_type,
        data,
    )
}

pub fn thumbnail_upload(
    video_id: impl std::fmt::Display,
    auth: Option<&str>,
    content_type: Option<&str>,
    data: &[u8],
) -> Request<Body> {
    upload_request(
        &format!("/api/thumbnail_upload/{}", video_id),
        auth,
        "thumbnail",
        content_type,
        data,
    )
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Bytes standing in for an MP4 upload.
pub fn sample_video() -> Vec<u8> {
    let mut data = b"\x00\x00\x00\x18ftypmp42".to_vec();
    data.extend(std::iter::repeat(0xAB).take(4096));
    data
}
