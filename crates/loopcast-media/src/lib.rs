//! FFmpeg CLI wrapper and asset I/O for the Loopcast pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building (argument vectors, never shell strings)
//! - Progress parsing from `-progress pipe:2`
//! - FFprobe duration probing
//! - HTTP asset fetching with cover-image validation and bounded batches
//! - Job workspace lifecycle and cross-device-safe artifact moves

pub mod command;
pub mod encode;
pub mod error;
pub mod fetch;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod workspace;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use encode::{assemble_audio, compose_video, write_concat_list};
pub use error::{MediaError, MediaResult};
pub use fetch::{fetch_assets, FetchedAssets};
pub use fs_utils::move_file;
pub use probe::probe_duration;
pub use progress::EncodeProgress;
pub use workspace::JobWorkspace;
