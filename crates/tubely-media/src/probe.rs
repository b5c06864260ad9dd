//! FFprobe geometry inspection.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use tubely_models::{classify_aspect, AspectCategory};

use crate::command::{ToolCommand, ToolRunner};
use crate::error::{MediaError, MediaResult};

/// Pixel dimensions of the primary video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn aspect(&self) -> AspectCategory {
        classify_aspect(self.width, self.height)
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    #[serde(default)]
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
}

/// Parse `ffprobe -show_streams -print_format json` output.
///
/// Picks the first stream tagged `video` with both dimensions nonzero;
/// later video streams are still considered when an earlier one is unusable.
pub fn parse_geometry(stdout: &[u8]) -> MediaResult<Geometry> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout).map_err(|e| {
        MediaError::inspection_failed(format!("unparseable ffprobe output: {}", e), None, None)
    })?;

    probe
        .streams
        .iter()
        .filter(|s| s.codec_type == "video")
        .find_map(|s| match (s.width, s.height) {
            (Some(width), Some(height)) if width > 0 && height > 0 => {
                Some(Geometry { width, height })
            }
            _ => None,
        })
        .ok_or(MediaError::NoUsableVideoStream)
}

/// Probe a local file for the geometry of its first usable video stream.
pub async fn probe_geometry(
    ffprobe: impl AsRef<Path>,
    runner: &ToolRunner,
    path: impl AsRef<Path>,
) -> MediaResult<Geometry> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let cmd = ToolCommand::new(ffprobe)
        .args(["-v", "error", "-print_format", "json", "-show_streams"])
        .arg(path);

    let output = runner.run(&cmd).await?;
    if !output.success() {
        return Err(MediaError::inspection_failed(
            "ffprobe exited with non-zero status",
            Some(output.stderr_lossy()),
            output.exit_code,
        ));
    }

    let geometry = parse_geometry(&output.stdout).map_err(|e| match e {
        MediaError::InspectionFailed { message, exit_code, .. } => {
            MediaError::InspectionFailed {
                message,
                stderr: Some(output.stderr_lossy()),
                exit_code,
            }
        }
        other => other,
    })?;

    debug!(
        width = geometry.width,
        height = geometry.height,
        "Probed {}",
        path.display()
    );
    Ok(geometry)
}
