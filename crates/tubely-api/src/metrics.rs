//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;
use uuid::Uuid;

/// Install the Prometheus recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "tubely_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "tubely_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "tubely_http_requests_in_flight";

    // Publishing pipeline
    pub const PUBLISH_RUNS_TOTAL: &str = "tubely_publish_runs_total";
    pub const PUBLISH_DURATION_SECONDS: &str = "tubely_publish_duration_seconds";
    pub const MEDIA_TOOL_DURATION_SECONDS: &str = "tubely_media_tool_duration_seconds";
    pub const UPLOAD_DURATION_SECONDS: &str = "tubely_object_upload_duration_seconds";
    pub const ORPHANED_OBJECTS_TOTAL: &str = "tubely_orphaned_objects_total";

    // Thumbnails
    pub const THUMBNAILS_STORED_TOTAL: &str = "tubely_thumbnails_stored_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "tubely_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a finished pipeline run. `state` is `done` or the state it failed in.
pub fn record_publish_outcome(state: &str, outcome: &str, duration_secs: f64) {
    let labels = [
        ("state", state.to_string()),
        ("outcome", outcome.to_string()),
    ];
    counter!(names::PUBLISH_RUNS_TOTAL, &labels).increment(1);
    histogram!(names::PUBLISH_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record an ffmpeg/ffprobe invocation.
pub fn record_media_tool_duration(tool: &str, duration_secs: f64) {
    let labels = [("tool", tool.to_string())];
    histogram!(names::MEDIA_TOOL_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record object upload duration.
pub fn record_upload_duration(duration_secs: f64) {
    histogram!(names::UPLOAD_DURATION_SECONDS).record(duration_secs);
}

/// Record an object left behind by a failed metadata update.
pub fn record_orphaned_object(bucket: &str) {
    let labels = [("bucket", bucket.to_string())];
    counter!(names::ORPHANED_OBJECTS_TOTAL, &labels).increment(1);
}

pub fn record_thumbnail_stored(content_type: &str) {
    let labels = [("content_type", content_type.to_string())];
    counter!(names::THUMBNAILS_STORED_TOTAL, &labels).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Collapse ids and asset names so label cardinality stays bounded.
fn sanitize_path(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("/assets/") {
        if !rest.is_empty() {
            return "/assets/:file".to_string();
        }
    }

    path.split('/')
        .map(|segment| {
            if Uuid::parse_str(segment).is_ok() {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
