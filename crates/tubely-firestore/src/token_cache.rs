//! Access token caching for Firestore authentication.
//!
//! Tokens are refreshed a fixed margin before expiry. Refresh is
//! single-flight (one task refreshes under the write lock, others wait and
//! reuse), and a refresh failure falls back to the current token while it is
//! still unexpired.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use gcp_auth::TokenProvider;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{FirestoreError, FirestoreResult};

/// Refresh this long before the token expires.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// TTL assumed when the provider's expiry cannot be converted.
const FALLBACK_TTL: Duration = Duration::from_secs(50 * 60);

/// OAuth scope for Firestore access.
pub const FIRESTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

#[derive(Clone)]
struct Cached {
    token: String,
    expires_at: Instant,
}

impl Cached {
    fn fresh(&self, now: Instant) -> bool {
        now + REFRESH_MARGIN < self.expires_at
    }

    fn unexpired(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Shared token cache in front of a `gcp_auth` provider.
pub struct TokenCache {
    provider: Arc<dyn TokenProvider>,
    slot: RwLock<Option<Cached>>,
}

impl TokenCache {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            slot: RwLock::new(None),
        }
    }

    /// Drop the cached token (e.g. after the server rejected it).
    pub async fn invalidate(&self) {
        *self.slot.write().await = None;
    }

    /// Current access token, refreshing when inside the margin.
    pub async fn get_token(&self) -> FirestoreResult<String> {
        if let Some(cached) = self.slot.read().await.as_ref() {
            if cached.fresh(Instant::now()) {
                return Ok(cached.token.clone());
            }
        }

        let mut slot = self.slot.write().await;
        // Another task may have refreshed while we waited for the lock.
        if let Some(cached) = slot.as_ref() {
            if cached.fresh(Instant::now()) {
                return Ok(cached.token.clone());
            }
        }

        match self.provider.token(&[FIRESTORE_SCOPE]).await {
            Ok(token) => {
                let remaining = token.expires_at() - Utc::now();
                let ttl = if remaining <= chrono::Duration::zero() {
                    Duration::ZERO
                } else {
                    remaining.to_std().unwrap_or(FALLBACK_TTL)
                };

                let cached = Cached {
                    token: token.as_str().to_string(),
                    expires_at: Instant::now() + ttl,
                };
                *slot = Some(cached.clone());

                debug!(ttl_secs = ttl.as_secs(), "Refreshed Firestore access token");
                Ok(cached.token)
            }
            Err(e) => match slot.as_ref() {
                Some(cached) if cached.unexpired(Instant::now()) => {
                    warn!("Token refresh failed, reusing current token: {}", e);
                    Ok(cached.token.clone())
                }
                _ => Err(FirestoreError::auth_error(format!(
                    "Failed to obtain auth token: {}",
                    e
                ))),
            },
        }
    }
}
