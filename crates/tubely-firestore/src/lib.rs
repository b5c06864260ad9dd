//! Firestore REST API client.
//!
//! This crate provides:
//! - The [`VideoStore`] boundary used by the upload handlers
//! - A Firestore-backed video repository with optimistic concurrency
//! - Service account authentication via gcp_auth (or the local emulator)

pub mod client;
pub mod error;
pub mod metrics;
pub mod repos;
pub mod token_cache;
pub mod types;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use repos::{VideoRepository, VideoStore, VIDEOS_COLLECTION};
pub use types::{Document, FromFirestoreValue, ToFirestoreValue, Value};
