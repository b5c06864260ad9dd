//! API middleware.

use std::collections::HashMap;
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderName, HeaderValue, Method, Request, Response, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::metrics;

/// Per-IP rate limiter using governor.
pub type IpRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Upper bound on tracked client IPs.
const MAX_RATE_LIMITER_ENTRIES: usize = 10_000;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// IP-based rate limiter cache with TTL cleanup.
#[derive(Clone)]
pub struct RateLimiterCache {
    limiters: Arc<RwLock<HashMap<IpAddr, (Arc<IpRateLimiter>, Instant)>>>,
    quota: Quota,
    ttl: Duration,
}

impl RateLimiterCache {
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            limiters: Arc::new(RwLock::new(HashMap::new())),
            quota: Quota::per_second(rps),
            ttl: Duration::from_secs(3600),
        }
    }

    /// Drop expired limiters, then the oldest ones while over capacity.
    async fn cleanup_expired(&self) {
        let mut limiters = self.limiters.write().await;
        let now = Instant::now();
        limiters.retain(|_, (_, created_at)| now.duration_since(*created_at) < self.ttl);

        if limiters.len() >= MAX_RATE_LIMITER_ENTRIES {
            let mut entries: Vec<_> = limiters.iter().map(|(ip, (_, t))| (*ip, *t)).collect();
            entries.sort_by_key(|(_, t)| *t);

            let to_remove = limiters.len() + 1 - MAX_RATE_LIMITER_ENTRIES;
            for (ip, _) in entries.into_iter().take(to_remove) {
                limiters.remove(&ip);
            }
            warn!("Rate limiter cache at capacity, evicted {} entries", to_remove);
        }
    }

    /// Get or create a rate limiter for an IP.
    pub async fn get_limiter(&self, ip: IpAddr) -> Arc<IpRateLimiter> {
        if let Some((limiter, _)) = self.limiters.read().await.get(&ip) {
            return Arc::clone(limiter);
        }

        if self.limiters.read().await.len() >= MAX_RATE_LIMITER_ENTRIES {
            self.cleanup_expired().await;
        }

        let mut limiters = self.limiters.write().await;
        let (limiter, _) = limiters
            .entry(ip)
            .or_insert_with(|| (Arc::new(RateLimiter::direct(self.quota)), Instant::now()));
        Arc::clone(limiter)
    }

    /// Check rate limit for an IP.
    pub async fn check(&self, ip: IpAddr) -> bool {
        self.get_limiter(ip).await.check().is_ok()
    }
}

/// Create CORS layer.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let max_age = Duration::from_secs(600);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(Any)
            .allow_origin(Any)
            .max_age(max_age);
    }

    // Credentials cannot be combined with wildcard headers.
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ORIGIN,
        ])
        .expose_headers([
            header::CONTENT_LENGTH,
            header::CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .allow_credentials(true)
        .allow_origin(origins)
        .max_age(max_age)
}

/// Security headers middleware.
pub async fn security_headers(request: Request<Body>, next: Next) -> Response<Body> {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static("camera=(), geolocation=(), microphone=(), payment=(), usb=()"),
    );
    // Thumbnails under /assets are embedded by other origins.
    headers.insert(
        HeaderName::from_static("cross-origin-resource-policy"),
        HeaderValue::from_static("cross-origin"),
    );

    response
}

/// Propagate or generate `X-Request-ID`.
pub async fn request_id(mut request: Request<Body>, next: Next) -> Response<Body> {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Request id stored in request extensions.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Request logging middleware.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_default();
    let start = Instant::now();

    let response = next.run(request).await;

    if !matches!(uri.path(), "/health" | "/healthz" | "/ready") {
        info!(
            method = %method,
            uri = %uri,
            status = %response.status(),
            duration_ms = %start.elapsed().as_millis(),
            request_id = %request_id,
            "Request completed"
        );
    }

    response
}

/// Per-IP rate limiting.
pub async fn rate_limit_middleware(
    State(rate_limiter): State<Arc<RateLimiterCache>>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    if let Some(ip) = extract_client_ip(&request) {
        if !rate_limiter.check(ip).await {
            warn!(ip = %ip, "Rate limit exceeded");
            metrics::record_rate_limit_hit(request.uri().path());
            return (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, "1")],
                "Rate limit exceeded. Please try again later.",
            )
                .into_response();
        }
    }

    next.run(request).await
}

/// Client IP from proxy headers, falling back to the socket address.
fn extract_client_ip(request: &Request<Body>) -> Option<IpAddr> {
    let header_ip = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse().ok())
    };

    header_ip("x-forwarded-for")
        .or_else(|| header_ip("x-real-ip"))
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<std::net::SocketAddr>>()
                .map(|ci| ci.0.ip())
        })
}
