//! Video upload endpoint tests.

mod common;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use mockall::mock;
use tower::ServiceExt;

use tubely_media::{Geometry, MediaResult, MediaToolkit};
use tubely_models::{UserId, VideoId};
use tubely_storage::{KeySource, StorageKey, StorageResult};

use common::*;

mock! {
    pub Toolkit {}

    #[async_trait]
    impl MediaToolkit for Toolkit {
        async fn fast_start(&self, input: &Path) -> MediaResult<PathBuf>;
        async fn probe_geometry(&self, path: &Path) -> MediaResult<Geometry>;
    }
}

mock! {
    pub Keys {}

    impl KeySource for Keys {
        fn generate(&self, extension: &str) -> StorageResult<StorageKey>;
    }
}

#[tokio::test]
async fn test_owner_upload_publishes_video() {
    let app = TestApp::builder().build();
    let data = sample_video();

    let response = app
        .router
        .clone()
        .oneshot(video_upload(
            app.video.id,
            Some(&bearer(app.owner)),
            Some("video/mp4"),
            &data,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["id"], app.video.id.to_string());
    assert_eq!(json["title"], "Boots");

    let url = json["video_url"].as_str().expect("video_url set");
    let key = app.objects.key_for_url(url).expect("url points into the bucket");
    assert!(key.ends_with(".mp4"));
    // 32 random bytes, unpadded base64.
    assert_eq!(key.trim_end_matches(".mp4").len(), 43);

    let object = app.objects.get(&key).expect("object uploaded");
    assert_eq!(object.data, data);
    assert_eq!(object.content_type, "video/mp4");
    assert!(object
        .metadata
        .contains(&("aspect".to_string(), "wide".to_string())));

    let stored = app.videos.get(&app.video.id).unwrap();
    assert_eq!(stored.video_url.as_deref(), Some(url));
    assert_eq!(app.leftover_temp_files(), 0);
}

#[tokio::test]
async fn test_non_owner_rejected_before_any_work() {
    let mut toolkit = MockToolkit::new();
    toolkit.expect_fast_start().never();
    toolkit.expect_probe_geometry().never();
    let mut keys = MockKeys::new();
    keys.expect_generate().never();

    let app = TestApp::builder()
        .toolkit(Arc::new(toolkit))
        .keys(Arc::new(keys))
        .build();

    let response = app
        .router
        .clone()
        .oneshot(video_upload(
            app.video.id,
            Some(&bearer(UserId::new())),
            Some("video/mp4"),
            &sample_video(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.objects.len(), 0);
    assert!(app.videos.get(&app.video.id).unwrap().video_url.is_none());
    assert_eq!(app.leftover_temp_files(), 0);
}

#[tokio::test]
async fn test_transcoder_failure_cleans_up() {
    let app = TestApp::builder()
        .toolkit(Arc::new(FakeToolkit::failing()))
        .build();

    let response = app
        .router
        .clone()
        .oneshot(video_upload(
            app.video.id,
            Some(&bearer(app.owner)),
            Some("video/mp4"),
            &sample_video(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["code"], "internal");
    assert!(!json["detail"].as_str().unwrap().contains("moov"));

    assert_eq!(app.objects.len(), 0);
    assert!(app.videos.get(&app.video.id).unwrap().video_url.is_none());
    assert_eq!(app.leftover_temp_files(), 0);
}

#[tokio::test]
async fn test_object_upload_failure_leaves_record_untouched() {
    let app = TestApp::builder()
        .objects(MemoryObjectStore::failing())
        .build();

    let response = app
        .router
        .clone()
        .oneshot(video_upload(
            app.video.id,
            Some(&bearer(app.owner)),
            Some("video/mp4"),
            &sample_video(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(app.videos.get(&app.video.id).unwrap().video_url.is_none());
    assert_eq!(app.leftover_temp_files(), 0);
}

#[tokio::test]
async fn test_metadata_update_failure_orphans_object() {
    let app = TestApp::builder().build();
    app.videos.fail_updates();

    let response = app
        .router
        .clone()
        .oneshot(video_upload(
            app.video.id,
            Some(&bearer(app.owner)),
            Some("video/mp4"),
            &sample_video(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["code"], "internal");
    // The uploaded object stays behind; the record is untouched.
    assert_eq!(app.objects.len(), 1);
    assert!(app.videos.get(&app.video.id).unwrap().video_url.is_none());
    assert_eq!(app.leftover_temp_files(), 0);
}

#[tokio::test]
async fn test_geometry_failure_publishes_without_aspect() {
    let toolkit = FakeToolkit {
        fail_geometry: true,
        ..FakeToolkit::wide()
    };
    let app = TestApp::builder().toolkit(Arc::new(toolkit)).build();

    let response = app
        .router
        .clone()
        .oneshot(video_upload(
            app.video.id,
            Some(&bearer(app.owner)),
            Some("video/mp4"),
            &sample_video(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let key = app
        .objects
        .key_for_url(json["video_url"].as_str().unwrap())
        .unwrap();
    let object = app.objects.get(&key).unwrap();
    assert!(object.metadata.iter().all(|(name, _)| name != "aspect"));
    assert_eq!(app.leftover_temp_files(), 0);
}

#[tokio::test]
async fn test_concurrent_uploads_to_same_video() {
    let toolkit = FakeToolkit {
        remux_delay: Some(Duration::from_millis(50)),
        ..FakeToolkit::wide()
    };
    let app = TestApp::builder().toolkit(Arc::new(toolkit)).build();
    let auth = bearer(app.owner);

    let first = app.router.clone().oneshot(video_upload(
        app.video.id,
        Some(&auth),
        Some("video/mp4"),
        b"first upload",
    ));
    let second = app.router.clone().oneshot(video_upload(
        app.video.id,
        Some(&auth),
        Some("video/mp4"),
        b"second upload",
    ));
    let (first, second) = tokio::join!(first, second);

    let mut published = Vec::new();
    for response in [first.unwrap(), second.unwrap()] {
        match response.status() {
            StatusCode::OK => {
                let json = json_body(response).await;
                published.push(json["video_url"].as_str().unwrap().to_string());
            }
            // Lost the optimistic-concurrency race.
            StatusCode::CONFLICT => {}
            other => panic!("unexpected status {}", other),
        }
    }

    assert!(!published.is_empty());
    // Every run uploaded its own object under its own key.
    assert_eq!(app.objects.len(), 2);
    let keys = app.objects.keys();
    assert_ne!(keys[0], keys[1]);

    let final_url = app.videos.get(&app.video.id).unwrap().video_url.unwrap();
    assert_eq!(&final_url, published.last().unwrap());
    assert!(app.objects.key_for_url(&final_url).is_some());
    assert_eq!(app.leftover_temp_files(), 0);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::builder().build();

    let response = app
        .router
        .clone()
        .oneshot(video_upload(app.video.id, None, Some("video/mp4"), b"data"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .router
        .clone()
        .oneshot(video_upload(
            app.video.id,
            Some("Bearer not-a-jwt"),
            Some("video/mp4"),
            b"data",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.objects.len(), 0);
}

#[tokio::test]
async fn test_invalid_video_id_is_bad_request() {
    let app = TestApp::builder().build();

    let response = app
        .router
        .clone()
        .oneshot(video_upload(
            "not-a-uuid",
            Some(&bearer(app.owner)),
            Some("video/mp4"),
            b"data",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "bad_request");
}

#[tokio::test]
async fn test_unknown_video_is_not_found() {
    let app = TestApp::builder().build();

    let response = app
        .router
        .clone()
        .oneshot(video_upload(
            VideoId::new(),
            Some(&bearer(app.owner)),
            Some("video/mp4"),
            b"data",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.leftover_temp_files(), 0);
}

#[tokio::test]
async fn test_unsupported_content_type() {
    let app = TestApp::builder().build();

    let response = app
        .router
        .clone()
        .oneshot(video_upload(
            app.video.id,
            Some(&bearer(app.owner)),
            Some("video/webm"),
            b"data",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(app.objects.len(), 0);
    assert_eq!(app.leftover_temp_files(), 0);
}

#[tokio::test]
async fn test_missing_part_or_content_type_is_bad_request() {
    let app = TestApp::builder().build();
    let auth = bearer(app.owner);

    let wrong_field = upload_request(
        &format!("/api/video_upload/{}", app.video.id),
        Some(&auth),
        "file",
        Some("video/mp4"),
        b"data",
    );
    let response = app.router.clone().oneshot(wrong_field).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .router
        .clone()
        .oneshot(video_upload(app.video.id, Some(&auth), None, b"data"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.leftover_temp_files(), 0);
}

#[tokio::test]
async fn test_oversized_upload_rejected() {
    let app = TestApp::builder().max_upload_bytes(1024).build();

    // Past the route's body limit: rejected from Content-Length alone.
    let response = app
        .router
        .clone()
        .oneshot(video_upload(
            app.video.id,
            Some(&bearer(app.owner)),
            Some("video/mp4"),
            &vec![0u8; 256 * 1024],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    // Within the multipart allowance but over the file ceiling: caught while staging.
    let response = app
        .router
        .clone()
        .oneshot(video_upload(
            app.video.id,
            Some(&bearer(app.owner)),
            Some("video/mp4"),
            &vec![0u8; 4096],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json_body(response).await["code"], "payload_too_large");

    assert_eq!(app.objects.len(), 0);
    assert_eq!(app.leftover_temp_files(), 0);
}

#[tokio::test]
async fn test_get_video_owner_only() {
    let app = TestApp::builder().build();
    let path = format!("/api/videos/{}", app.video.id);

    let request = Request::builder()
        .uri(&path)
        .header(header::AUTHORIZATION, bearer(app.owner))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["user_id"], app.owner.to_string());

    let request = Request::builder()
        .uri(&path)
        .header(header::AUTHORIZATION, bearer(UserId::new()))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_response_headers() {
    let app = TestApp::builder().build();

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-123");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
}

#[tokio::test]
async fn test_ready_reports_checks() {
    let app = TestApp::builder().build();

    let request = Request::builder().uri("/ready").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ready");
    assert_eq!(json["checks"]["firestore"]["status"], "ok");
    assert_eq!(json["checks"]["storage"]["status"], "ok");
}
