//! Bearer token authentication.

use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use tubely_models::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// Issuer of access tokens.
pub const TOKEN_ISSUER: &str = "tubely-access";

/// Access token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Issued at
    pub iat: i64,
    /// Expiration
    pub exp: i64,
}

/// Authenticated user extracted from request.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: UserId,
}

/// Sign an HS256 access token for `user`.
pub fn issue_access_token(
    user: UserId,
    secret: &str,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.to_string(),
        iss: TOKEN_ISSUER.to_string(),
        iat: now,
        exp: now + ttl.as_secs() as i64,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Validate signature, issuer and expiry, returning the subject.
pub fn verify_access_token(token: &str, secret: &str) -> Result<UserId, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[TOKEN_ISSUER]);
    validation.leeway = 0;

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| {
            debug!("Token validation failed: {}", e);
            ApiError::unauthorized("Couldn't validate JWT")
        })?;

    data.claims
        .sub
        .parse()
        .map_err(|_| ApiError::unauthorized("Invalid user ID in token"))
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
fn bearer_token(header: Option<&str>) -> Result<&str, ApiError> {
    let header = header.ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header format"))
}

/// Axum extractor for authenticated user.
#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let token = bearer_token(header)?;
        let user_id = verify_access_token(token, &state.config.jwt_secret)?;
        Ok(AuthUser { user_id })
    }
}
