//! FFmpeg CLI wrappers used by the upload pipeline.
//!
//! This crate provides:
//! - A small process runner with captured output and optional timeout
//! - Geometry probing via `ffprobe`
//! - Fast-start remuxing via `ffmpeg` (stream copy, index moved to front)
//! - The [`MediaToolkit`] seam the publishing pipeline is written against

pub mod command;
pub mod error;
pub mod faststart;
pub mod probe;
pub mod toolkit;

pub use command::{check_tool, ToolCommand, ToolOutput, ToolRunner};
pub use error::{MediaError, MediaResult};
pub use faststart::{fast_start, faststart_output_path, FASTSTART_SUFFIX};
pub use probe::{parse_geometry, probe_geometry, Geometry};
pub use toolkit::{FfmpegToolkit, MediaToolkit};
