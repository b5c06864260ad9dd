//! Object storage for published media.
//!
//! This crate provides:
//! - The [`ObjectStore`] boundary used by the publishing pipeline
//! - An S3 implementation on `aws-sdk-s3`
//! - Random, URL-safe storage key generation

pub mod client;
pub mod error;
pub mod keys;
pub mod store;

pub use client::{S3Client, S3Config};
pub use error::{StorageError, StorageResult};
pub use keys::{KeySource, RandomKeySource, StorageKey, KEY_BYTES};
pub use store::ObjectStore;
