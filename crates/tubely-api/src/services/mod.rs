//! Business logic services.

pub mod publisher;
pub mod thumbnails;

pub use publisher::{BodyError, PublishError, PublishState, VideoPublisher, VideoUpload};
pub use thumbnails::ThumbnailService;
