//! Axum HTTP API server.
//!
//! This crate provides:
//! - The video publishing pipeline (stage, remux, probe, upload, publish)
//! - Thumbnail intake served from a local assets directory
//! - Bearer token authentication
//! - Rate limiting, security headers and Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use auth::{issue_access_token, verify_access_token, AuthUser};
pub use config::{ApiConfig, ConfigError, PublishConfig};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{PublishError, PublishState, ThumbnailService, VideoPublisher, VideoUpload};
pub use state::AppState;
