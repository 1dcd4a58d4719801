//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum jobs in an active (non-Queued, non-terminal) stage at once.
    /// Jobs beyond the ceiling stay Queued until a slot frees.
    pub max_concurrent_jobs: usize,
    /// Concurrent track downloads per job
    pub download_batch_size: usize,
    /// Root directory for per-job workspaces
    pub work_dir: PathBuf,
    /// Directory finished artifacts are moved into
    pub output_dir: PathBuf,
    /// Timeout for the best-effort webhook notification
    pub notify_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            download_batch_size: 3,
            work_dir: PathBuf::from("/tmp/loopcast"),
            output_dir: PathBuf::from("/tmp/loopcast/output"),
            notify_timeout: Duration::from_secs(10),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_concurrent_jobs: std::env::var("LOOPCAST_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            download_batch_size: std::env::var("LOOPCAST_DOWNLOAD_BATCH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            work_dir: std::env::var("LOOPCAST_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp/loopcast")),
            output_dir: std::env::var("LOOPCAST_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp/loopcast/output")),
            notify_timeout: Duration::from_secs(
                std::env::var("LOOPCAST_NOTIFY_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }
}
