//! Job-scoped workspace on the local filesystem.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::MediaResult;

/// Temporary storage for one job: fetched assets and intermediate
/// artifacts. Created when downloading starts and deleted exactly once
/// when the job terminates, success or failure.
#[derive(Debug)]
pub struct JobWorkspace {
    root: PathBuf,
}

impl JobWorkspace {
    /// Create the workspace directory for a job under `work_dir`.
    pub async fn create(work_dir: impl AsRef<Path>, job_id: &str) -> MediaResult<Self> {
        let root = work_dir.as_ref().join(format!("job-{job_id}"));
        fs::create_dir_all(&root).await?;
        debug!(workspace = %root.display(), "Created job workspace");
        Ok(Self { root })
    }

    /// Workspace root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path for the fetched cover image.
    pub fn cover_path(&self, ext: &str) -> PathBuf {
        self.root.join(format!("cover.{ext}"))
    }

    /// Path for a fetched track, named by playlist position.
    pub fn track_path(&self, index: usize, ext: &str) -> PathBuf {
        self.root.join(format!("track_{index:03}.{ext}"))
    }

    /// Path for the concat demuxer list file.
    pub fn concat_list_path(&self) -> PathBuf {
        self.root.join("playlist.ffconcat")
    }

    /// Path for the assembled audio track.
    pub fn audio_path(&self) -> PathBuf {
        self.root.join("audio.m4a")
    }

    /// Path for the composed video before it moves to the output location.
    pub fn video_path(&self) -> PathBuf {
        self.root.join("video.mp4")
    }

    /// Delete the workspace and everything in it. Consumes the workspace;
    /// a job's workspace is deleted at most once.
    pub async fn cleanup(self) -> MediaResult<()> {
        debug!(workspace = %self.root.display(), "Removing job workspace");
        fs::remove_dir_all(&self.root).await?;
        Ok(())
    }
}
