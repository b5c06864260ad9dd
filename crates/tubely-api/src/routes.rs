//! API routes.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;

use crate::handlers::{get_video, health, ready, upload_thumbnail, upload_video};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let max_upload = usize::try_from(state.publisher.config().max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);
    let max_thumbnail = state
        .config
        .max_thumbnail_bytes
        .saturating_add(MULTIPART_OVERHEAD);

    // Upload routes replace axum's default 2 MB extractor limit with their own ceiling.
    let video_upload = Router::new()
        .route("/video_upload/:video_id", post(upload_video))
        .route_layer(DefaultBodyLimit::disable())
        .route_layer(RequestBodyLimitLayer::new(max_upload));
    let thumbnail_upload = Router::new()
        .route("/thumbnail_upload/:video_id", post(upload_thumbnail))
        .route_layer(DefaultBodyLimit::disable())
        .route_layer(RequestBodyLimitLayer::new(max_thumbnail));

    let video_routes = Router::new().route("/videos/:video_id", get(get_video));

    let rate_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));
    let api_routes = Router::new()
        .merge(video_upload)
        .merge(thumbnail_upload)
        .merge(video_routes)
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .nest_service("/assets", ServeDir::new(&state.config.assets_root))
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
