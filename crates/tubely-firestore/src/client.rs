//! Firestore REST API client.
//!
//! - Token caching with refresh margin (or no auth against the emulator)
//! - HTTP client tuning (pooling, timeouts)
//! - Field-masked updates with `currentDocument.updateTime` preconditions
//! - Observability (tracing spans, metrics)

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, info, info_span, Instrument};

use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::record_request;
use crate::token_cache::TokenCache;
use crate::types::{Document, Value};

/// Firestore client configuration.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// GCP project ID
    pub project_id: String,
    /// Database ID (usually "(default)")
    pub database_id: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// `host:port` of a local Firestore emulator. Disables authentication.
    pub emulator_host: Option<String>,
}

impl FirestoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> FirestoreResult<Self> {
        let project_id = std::env::var("FIRESTORE_PROJECT_ID")
            .or_else(|_| std::env::var("GCP_PROJECT_ID"))
            .unwrap_or_default();

        if project_id.trim().is_empty() {
            return Err(FirestoreError::auth_error(
                "FIRESTORE_PROJECT_ID or GCP_PROJECT_ID must be set to access Firestore",
            ));
        }

        let secs = |name: &str, default: u64| -> Duration {
            Duration::from_secs(
                std::env::var(name)
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(default),
            )
        };

        Ok(Self {
            project_id,
            database_id: std::env::var("FIRESTORE_DATABASE_ID")
                .unwrap_or_else(|_| "(default)".to_string()),
            timeout: secs("FIRESTORE_TIMEOUT_SECS", 30),
            connect_timeout: secs("FIRESTORE_CONNECT_TIMEOUT_SECS", 5),
            emulator_host: std::env::var("FIRESTORE_EMULATOR_HOST")
                .ok()
                .filter(|h| !h.trim().is_empty()),
        })
    }
}

/// Firestore REST API client.
#[derive(Clone)]
pub struct FirestoreClient {
    http: Client,
    config: FirestoreConfig,
    base_url: String,
    tokens: Option<Arc<TokenCache>>,
}

impl FirestoreClient {
    /// Create a new Firestore client.
    ///
    /// Uses the emulator when `emulator_host` is set, otherwise the service
    /// account named by `GOOGLE_APPLICATION_CREDENTIALS`.
    pub async fn new(config: FirestoreConfig) -> FirestoreResult<Self> {
        match config.emulator_host.clone() {
            Some(host) => {
                info!(host = %host, "Using Firestore emulator");
                Self::with_endpoint(config, &format!("http://{}", host), None)
            }
            None => {
                let provider = Self::service_account()?;
                Self::with_endpoint(config, "https://firestore.googleapis.com", Some(provider))
            }
        }
    }

    /// Create a client against an explicit endpoint. `None` sends no credentials.
    pub fn with_endpoint(
        config: FirestoreConfig,
        endpoint: &str,
        provider: Option<Arc<dyn TokenProvider>>,
    ) -> FirestoreResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("tubely-firestore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FirestoreError::Network)?;

        let base_url = format!(
            "{}/v1/projects/{}/databases/{}/documents",
            endpoint.trim_end_matches('/'),
            config.project_id,
            config.database_id
        );

        Ok(Self {
            http,
            config,
            base_url,
            tokens: provider.map(|p| Arc::new(TokenCache::new(p))),
        })
    }

    fn service_account() -> FirestoreResult<Arc<dyn TokenProvider>> {
        let service_account = CustomServiceAccount::from_env().map_err(|e| {
            FirestoreError::auth_error(format!("Failed to load service account: {}", e))
        })?;

        match service_account {
            Some(sa) => Ok(Arc::new(sa)),
            None => Err(FirestoreError::auth_error(
                "GOOGLE_APPLICATION_CREDENTIALS not set. \
                 Set it to the path of your service account JSON file.",
            )),
        }
    }

    /// Create from environment variables.
    pub async fn from_env() -> FirestoreResult<Self> {
        let config = FirestoreConfig::from_env()?;
        Self::new(config).await
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    fn document_url(&self, collection: &str, doc_id: &str) -> String {
        format!("{}/{}/{}", self.base_url, collection, doc_id)
    }

    /// Get a document. `Ok(None)` if it does not exist.
    pub async fn get_document(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> FirestoreResult<Option<Document>> {
        let url = self.document_url(collection, doc_id);

        self.execute_request("get_document", collection, Some(doc_id), async {
            let response = self.send(|| self.http.get(&url)).await?;
            match response.status() {
                StatusCode::OK => Ok(Some(response.json::<Document>().await?)),
                StatusCode::NOT_FOUND => Ok(None),
                status => Err(Self::error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Patch the masked fields of an existing document.
    ///
    /// With `update_time` set, the write only applies if the document's
    /// server update time still equals it; otherwise
    /// [`FirestoreError::PreconditionFailed`] is returned.
    pub async fn update_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
        update_mask: &[&str],
        update_time: Option<&str>,
    ) -> FirestoreResult<Document> {
        let mut params: Vec<String> = update_mask
            .iter()
            .map(|f| format!("updateMask.fieldPaths={}", urlencoding::encode(f)))
            .collect();
        match update_time {
            Some(ts) => params.push(format!(
                "currentDocument.updateTime={}",
                urlencoding::encode(ts)
            )),
            // Never create the document as a side effect of an update.
            None => params.push("currentDocument.exists=true".to_string()),
        }
        let url = format!("{}?{}", self.document_url(collection, doc_id), params.join("&"));
        let body = Document::new(fields);

        self.execute_request("update_document", collection, Some(doc_id), async {
            let response = self.send(|| self.http.patch(&url).json(&body)).await?;
            match response.status() {
                StatusCode::OK => Ok(response.json::<Document>().await?),
                StatusCode::NOT_FOUND => Err(FirestoreError::not_found(format!(
                    "{}/{}",
                    collection, doc_id
                ))),
                status => Err(Self::error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Verify the database is reachable and credentials are accepted.
    pub async fn health_check(&self) -> FirestoreResult<()> {
        self.get_document("_health", "ping").await.map(|_| ())
    }

    /// Send a request with auth, retrying once with a fresh token if the
    /// cached one was rejected as expired.
    async fn send<F>(&self, build: F) -> FirestoreResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let Some(tokens) = &self.tokens else {
            return Ok(build().send().await?);
        };

        let token = tokens.get_token().await?;
        let response = build().bearer_auth(&token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if !is_access_token_expired(&body) {
            return Err(FirestoreError::from_http_status(401, body));
        }

        debug!("Firestore rejected expired token, refreshing");
        tokens.invalidate().await;
        let token = tokens.get_token().await?;
        Ok(build().bearer_auth(&token).send().await?)
    }

    /// Execute a request with tracing and metrics.
    async fn execute_request<T, F>(
        &self,
        operation: &str,
        collection: &str,
        doc_id: Option<&str>,
        fut: F,
    ) -> FirestoreResult<T>
    where
        F: std::future::Future<Output = FirestoreResult<T>>,
    {
        let span = info_span!(
            "firestore_request",
            operation = %operation,
            collection = %collection,
            doc_id = doc_id.unwrap_or("")
        );

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);

        result
    }

    async fn error_from_response(status: StatusCode, url: &str, response: Response) -> FirestoreError {
        let body = response.text().await.unwrap_or_default();
        FirestoreError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }
}

fn is_access_token_expired(body: &str) -> bool {
    body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
}
