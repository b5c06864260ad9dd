//! Video metadata models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Error returned when a path segment is not a valid identifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid video id: {0}")]
pub struct VideoIdParseError(pub String);

/// Unique identifier for a video record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub Uuid);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VideoId {
    type Err = VideoIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| VideoIdParseError(s.to_string()))
    }
}

impl From<Uuid> for VideoId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Identity of an authenticated user (token subject, record owner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Video metadata stored in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoRecord {
    /// Unique video ID
    pub id: VideoId,

    /// Owner
    pub user_id: UserId,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Public URL of the thumbnail image
    #[serde(default)]
    pub thumbnail_url: Option<String>,

    /// Public URL of the published video object
    #[serde(default)]
    pub video_url: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Store-assigned version token, used as an update precondition.
    #[serde(skip)]
    #[schemars(skip)]
    pub version: Option<String>,
}

impl VideoRecord {
    /// Create a new record with no media attached.
    pub fn new(id: VideoId, user_id: UserId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            title: title.into(),
            description: String::new(),
            thumbnail_url: None,
            video_url: None,
            created_at: now,
            updated_at: now,
            version: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.user_id == *user
    }
}
