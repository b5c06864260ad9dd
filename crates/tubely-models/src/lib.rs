//! Shared data models for the Tubely backend.
//!
//! This crate provides Serde-serializable types for:
//! - Video metadata records and their identifiers
//! - Aspect categories and the aspect classifier
//! - Accepted upload media types

pub mod aspect;
pub mod media_type;
pub mod video;

// Re-export common types
pub use aspect::{classify_aspect, AspectCategory, ASPECT_TOLERANCE};
pub use media_type::{extension_for, MediaKind, THUMBNAIL_CONTENT_TYPES, VIDEO_CONTENT_TYPES};
pub use video::{UserId, VideoId, VideoIdParseError, VideoRecord};
