//! Object store boundary.

use async_trait::async_trait;
use std::path::Path;

use crate::error::StorageResult;

/// Durable object storage.
///
/// `put_file` either fully succeeds (object readable afterwards) or fails
/// with the object absent.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket (or equivalent namespace) objects are written to.
    fn bucket(&self) -> &str;

    /// Stream a local file to `key`, tagged with `content_type` and user metadata.
    async fn put_file(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
        metadata: &[(String, String)],
    ) -> StorageResult<()>;

    async fn exists(&self, key: &str) -> StorageResult<bool>;

    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Public URL of the object stored under `key`.
    fn object_url(&self, key: &str) -> String;

    async fn check_connectivity(&self) -> StorageResult<()>;
}
