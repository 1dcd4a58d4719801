//! Encoder seam between orchestration and the external tool.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use loopcast_media::{EncodeProgress, JobWorkspace};
use loopcast_models::{EncodePreset, PlaylistManifest};

use crate::error::PipelineResult;

/// Callback receiving encode progress snapshots.
pub type ProgressFn = Box<dyn Fn(EncodeProgress) + Send + Sync>;

/// The two external-tool invocations of the pipeline.
///
/// Orchestration depends on this trait rather than on ffmpeg directly,
/// so the state machine, cleanup, and notification behavior are testable
/// without media tools installed.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Assemble the manifest into a single audio track of exactly
    /// `target_secs`, returning its path.
    async fn assemble_audio(
        &self,
        workspace: &JobWorkspace,
        manifest: &PlaylistManifest,
        track_paths: &[PathBuf],
        preset: EncodePreset,
    ) -> PipelineResult<PathBuf>;

    /// Compose the final video from the cover and the assembled audio,
    /// returning its path inside the workspace.
    async fn compose_video(
        &self,
        workspace: &JobWorkspace,
        cover: &Path,
        audio: &Path,
        target_secs: f64,
        preset: EncodePreset,
        progress: ProgressFn,
    ) -> PipelineResult<PathBuf>;
}

/// Production encoder driving ffmpeg.
#[derive(Debug, Default)]
pub struct FfmpegEncoder;

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn assemble_audio(
        &self,
        workspace: &JobWorkspace,
        manifest: &PlaylistManifest,
        track_paths: &[PathBuf],
        preset: EncodePreset,
    ) -> PipelineResult<PathBuf> {
        let list = loopcast_media::write_concat_list(
            workspace.concat_list_path(),
            manifest,
            track_paths,
        )
        .await?;

        let output = workspace.audio_path();
        loopcast_media::assemble_audio(&list, &output, manifest.target_secs, preset).await?;
        Ok(output)
    }

    async fn compose_video(
        &self,
        workspace: &JobWorkspace,
        cover: &Path,
        audio: &Path,
        target_secs: f64,
        preset: EncodePreset,
        progress: ProgressFn,
    ) -> PipelineResult<PathBuf> {
        let output = workspace.video_path();
        loopcast_media::compose_video(cover, audio, &output, target_secs, preset, move |p| {
            progress(p)
        })
        .await?;
        Ok(output)
    }
}
