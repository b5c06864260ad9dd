//! S3 client implementation.

use std::path::Path;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::store::ObjectStore;

/// Configuration for the S3 client.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Bucket name
    pub bucket: String,
    /// AWS region
    pub region: String,
    /// Custom S3-compatible endpoint (MinIO, R2, ...). Implies path-style addressing.
    pub endpoint_url: Option<String>,
    /// Static access key ID. The default credential chain is used when unset.
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Public base URL (CDN) objects are served from, without trailing slash.
    pub public_base_url: Option<String>,
}

impl S3Config {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        Ok(Self {
            bucket: non_empty("S3_BUCKET")
                .ok_or_else(|| StorageError::config_error("S3_BUCKET not set"))?,
            region: non_empty("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            endpoint_url: non_empty("S3_ENDPOINT_URL"),
            access_key_id: non_empty("AWS_ACCESS_KEY_ID"),
            secret_access_key: non_empty("AWS_SECRET_ACCESS_KEY"),
            public_base_url: non_empty("S3_PUBLIC_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string()),
        })
    }

    /// Public URL for `key` under this configuration.
    ///
    /// Order: configured public base, then path-style custom endpoint,
    /// then the virtual-hosted AWS form.
    pub fn object_url(&self, key: &str) -> String {
        if let Some(base) = &self.public_base_url {
            return format!("{}/{}", base, key);
        }
        if let Some(endpoint) = &self.endpoint_url {
            return format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key);
        }
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.bucket, self.region, key
        )
    }
}

/// S3 storage client.
#[derive(Clone)]
pub struct S3Client {
    client: Client,
    config: S3Config,
}

impl S3Client {
    /// Create a new S3 client from configuration.
    pub async fn new(config: S3Config) -> StorageResult<Self> {
        let region = Region::new(config.region.clone());

        let mut builder = match (&config.access_key_id, &config.secret_access_key) {
            (Some(key_id), Some(secret)) => {
                let credentials = Credentials::new(key_id, secret, None, None, "tubely-static");
                Builder::new()
                    .behavior_version(BehaviorVersion::latest())
                    .region(region)
                    .credentials_provider(credentials)
            }
            (None, None) => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(region)
                    .load()
                    .await;
                Builder::from(&shared)
            }
            _ => {
                return Err(StorageError::config_error(
                    "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set together",
                ))
            }
        };

        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let client = Client::from_conf(builder.build());
        info!(bucket = %config.bucket, region = %config.region, "S3 client configured");

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub async fn from_env() -> StorageResult<Self> {
        let config = S3Config::from_env()?;
        Self::new(config).await
    }

    pub fn config(&self) -> &S3Config {
        &self.config
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    fn bucket(&self) -> &str {
        &self.config.bucket
    }

    async fn put_file(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
        metadata: &[(String, String)],
    ) -> StorageResult<()> {
        debug!("Uploading {} to s3://{}/{}", path.display(), self.config.bucket, key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        let mut request = self
            .client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .body(body)
            .content_type(content_type);
        for (name, value) in metadata {
            request = request.metadata(name, value);
        }

        request
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!("Uploaded {} to s3://{}/{}", path.display(), self.config.bucket, key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.to_string().contains("NotFound") || e.to_string().contains("NoSuchKey") {
                    Ok(false)
                } else {
                    Err(StorageError::AwsSdk(e.to_string()))
                }
            }
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        debug!("Deleting {}", key);

        self.client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::delete_failed(e.to_string()))?;

        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        self.config.object_url(key)
    }

    async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.config.bucket)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(format!("S3 connectivity check failed: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> S3Config {
        S3Config {
            bucket: "tubely-123".to_string(),
            region: "us-east-2".to_string(),
            endpoint_url: None,
            access_key_id: None,
            secret_access_key: None,
            public_base_url: None,
        }
    }

    #[test]
    fn test_object_url_virtual_hosted() {
        assert_eq!(
            config().object_url("abc.mp4"),
            "https://tubely-123.s3.us-east-2.amazonaws.com/abc.mp4"
        );
    }

    #[test]
    fn test_object_url_custom_endpoint() {
        let cfg = S3Config {
            endpoint_url: Some("http://localhost:9000/".to_string()),
            ..config()
        };
        assert_eq!(cfg.object_url("abc.mp4"), "http://localhost:9000/tubely-123/abc.mp4");
    }

    #[test]
    fn test_object_url_public_base_wins() {
        let cfg = S3Config {
            endpoint_url: Some("http://localhost:9000".to_string()),
            public_base_url: Some("https://cdn.example.com".to_string()),
            ..config()
        };
        assert_eq!(cfg.object_url("abc.mp4"), "https://cdn.example.com/abc.mp4");
    }

    #[tokio::test]
    async fn test_partial_static_credentials_rejected() {
        let cfg = S3Config {
            access_key_id: Some("AKIA".to_string()),
            ..config()
        };
        assert!(matches!(
            S3Client::new(cfg).await,
            Err(StorageError::ConfigError(_))
        ));
    }
}
