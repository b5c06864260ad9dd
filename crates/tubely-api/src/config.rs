//! API configuration.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tubely_models::VIDEO_CONTENT_TYPES;

/// Largest accepted video upload (1 GiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 1 << 30;

/// Largest accepted thumbnail upload (10 MiB).
pub const DEFAULT_MAX_THUMBNAIL_BYTES: usize = 10 << 20;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second, per client IP
    pub rate_limit_rps: u32,
    /// Request timeout for non-upload routes
    pub request_timeout: Duration,
    /// Environment (development/production)
    pub environment: String,
    /// HS256 secret for access tokens
    pub jwt_secret: String,
    /// Public base URL of this server, used for asset links
    pub base_url: String,
    /// Directory thumbnails are written to and served from
    pub assets_root: PathBuf,
    /// Max thumbnail body size
    pub max_thumbnail_bytes: usize,
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = env_parse("API_PORT", 8091)?;
        let jwt_secret = std::env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        Ok(Self {
            host: env_or("API_HOST", "0.0.0.0"),
            port,
            cors_origins: env_or("CORS_ORIGINS", "*")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            rate_limit_rps: env_parse("RATE_LIMIT_RPS", 10)?,
            request_timeout: Duration::from_secs(env_parse("REQUEST_TIMEOUT", 30)?),
            environment: env_or("ENVIRONMENT", "development"),
            jwt_secret,
            base_url: env_or("BASE_URL", &format!("http://localhost:{}", port))
                .trim_end_matches('/')
                .to_string(),
            assets_root: PathBuf::from(env_or("ASSETS_ROOT", "./assets")),
            max_thumbnail_bytes: env_parse("MAX_THUMBNAIL_BYTES", DEFAULT_MAX_THUMBNAIL_BYTES)?,
        })
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

/// Settings handed to the video publishing pipeline at construction.
#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// Parent directory for per-run staging workspaces
    pub temp_dir: PathBuf,
    /// Upload size ceiling, enforced while staging
    pub max_upload_bytes: u64,
    /// Accepted video content types
    pub allowed_content_types: Vec<String>,
    /// Deadline for each ffmpeg/ffprobe invocation; `None` waits indefinitely
    pub tool_timeout_secs: Option<u64>,
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_content_types: VIDEO_CONTENT_TYPES.iter().map(|s| s.to_string()).collect(),
            tool_timeout_secs: None,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
        }
    }
}

impl PublishConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let tool_timeout_secs = match std::env::var("MEDIA_TOOL_TIMEOUT_SECS") {
            Ok(value) => Some(value.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "MEDIA_TOOL_TIMEOUT_SECS",
                value,
            })?),
            Err(_) => None,
        };

        Ok(Self {
            temp_dir: std::env::var("UPLOAD_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.temp_dir),
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            allowed_content_types: defaults.allowed_content_types,
            tool_timeout_secs,
            ffmpeg_path: std::env::var("FFMPEG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffmpeg_path),
            ffprobe_path: std::env::var("FFPROBE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffprobe_path),
        })
    }

    /// Whether `content_type` is on the allow-list. Parameters and case are ignored.
    pub fn accepts(&self, content_type: &str) -> bool {
        let essence = content_type.split(';').next().unwrap_or("").trim();
        self.allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(essence))
    }
}
