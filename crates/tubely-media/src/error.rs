//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while inspecting or remuxing a file.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{0} not found")]
    ToolNotFound(String),

    /// The inspection process exited abnormally or printed unparseable output.
    #[error("Inspection failed: {message}")]
    InspectionFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("No usable video stream")]
    NoUsableVideoStream,

    #[error("Remux failed: {message}")]
    RemuxFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("{tool} timed out after {secs} seconds")]
    Timeout { tool: String, secs: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create an inspection failure error.
    pub fn inspection_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::InspectionFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a remux failure error.
    pub fn remux_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::RemuxFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Captured standard error of the failed tool, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::InspectionFailed { stderr, .. } | Self::RemuxFailed { stderr, .. } => {
                stderr.as_deref()
            }
            _ => None,
        }
    }
}
