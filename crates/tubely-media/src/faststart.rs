//! Fast-start remux (moov atom relocated to the front, payload stream-copied).

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::command::{ToolCommand, ToolRunner};
use crate::error::{MediaError, MediaResult};

/// Suffix appended to the input path to name the remuxed output.
pub const FASTSTART_SUFFIX: &str = ".processed";

/// Output path for a remux of `input`: the full input path plus [`FASTSTART_SUFFIX`].
pub fn faststart_output_path(input: impl AsRef<Path>) -> PathBuf {
    let mut name: OsString = input.as_ref().as_os_str().to_owned();
    name.push(FASTSTART_SUFFIX);
    PathBuf::from(name)
}

/// Remux `input` for progressive playback, returning the new file's path.
///
/// The input file is left untouched. On failure no output is left behind.
pub async fn fast_start(
    ffmpeg: impl AsRef<Path>,
    runner: &ToolRunner,
    input: impl AsRef<Path>,
) -> MediaResult<PathBuf> {
    let input = input.as_ref();

    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    let output_path = faststart_output_path(input);
    let cmd = ToolCommand::new(ffmpeg)
        .args(["-y", "-v", "error", "-i"])
        .arg(input)
        .args(["-c", "copy", "-movflags", "faststart", "-f", "mp4"])
        .arg(&output_path);

    let result = runner.run(&cmd).await;
    let output = match result {
        Ok(output) if output.success() => output,
        Ok(output) => {
            remove_partial(&output_path).await;
            return Err(MediaError::remux_failed(
                "ffmpeg exited with non-zero status",
                Some(output.stderr_lossy()),
                output.exit_code,
            ));
        }
        Err(e) => {
            remove_partial(&output_path).await;
            return Err(e);
        }
    };

    if !output.stderr.is_empty() {
        debug!("ffmpeg: {}", output.stderr_lossy());
    }

    info!("Remuxed {} -> {}", input.display(), output_path.display());
    Ok(output_path)
}

async fn remove_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove partial output {}: {}", path.display(), e);
        }
    }
}
