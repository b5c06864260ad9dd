//! Media toolkit abstraction.
//!
//! The publishing pipeline only talks to [`MediaToolkit`], so the CLI tools
//! can be swapped for in-process implementations (or fakes in tests).

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::command::{check_tool, ToolRunner};
use crate::error::MediaResult;
use crate::faststart;
use crate::probe::{self, Geometry};

#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Remux `input` for progressive playback, returning the new file's path.
    async fn fast_start(&self, input: &Path) -> MediaResult<PathBuf>;

    /// Geometry of the first usable video stream.
    async fn probe_geometry(&self, path: &Path) -> MediaResult<Geometry>;
}

/// [`MediaToolkit`] backed by the `ffmpeg` and `ffprobe` binaries.
#[derive(Debug, Clone)]
pub struct FfmpegToolkit {
    ffmpeg_path: PathBuf,
    ffprobe_path: PathBuf,
    runner: ToolRunner,
}

impl Default for FfmpegToolkit {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl FfmpegToolkit {
    pub fn new(ffmpeg_path: impl Into<PathBuf>, ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
            runner: ToolRunner::new(),
        }
    }

    /// Bound each tool invocation. `None` waits indefinitely.
    pub fn with_timeout(mut self, secs: Option<u64>) -> Self {
        self.runner = self.runner.with_optional_timeout(secs);
        self
    }

    /// Verify both binaries resolve. Used at startup.
    pub fn check_available(&self) -> MediaResult<()> {
        check_tool(&self.ffmpeg_path)?;
        check_tool(&self.ffprobe_path)?;
        Ok(())
    }
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn fast_start(&self, input: &Path) -> MediaResult<PathBuf> {
        faststart::fast_start(&self.ffmpeg_path, &self.runner, input).await
    }

    async fn probe_geometry(&self, path: &Path) -> MediaResult<Geometry> {
        probe::probe_geometry(&self.ffprobe_path, &self.runner, path).await
    }
}
