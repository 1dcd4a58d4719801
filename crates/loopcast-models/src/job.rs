//! Job record owned by the job store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::spec::JobSpec;
use crate::status::JobStatus;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One submitted job and everything observable about it.
///
/// Owned exclusively by the job store; mutated only through the
/// orchestrator. External callers read snapshots via the query interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// The spec this job was submitted with
    pub spec: JobSpec,

    /// Current pipeline stage
    #[serde(default)]
    pub status: JobStatus,

    /// Progress (0-100), monotonically non-decreasing until terminal
    #[serde(default)]
    pub progress: u8,

    /// Path of the finished video (set only on Completed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    /// Error message (set only on Failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Indices of tracks whose duration came from the declared fallback
    /// because probing failed (degraded-accuracy mode)
    #[serde(default)]
    pub degraded_tracks: Vec<usize>,

    /// Cancellation requested by the caller; observed between stages
    #[serde(default)]
    pub cancel_requested: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// When the job left Queued
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// When the job reached a terminal state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a new queued job for a spec.
    pub fn new(spec: JobSpec) -> Self {
        Self {
            id: JobId::new(),
            spec,
            status: JobStatus::Queued,
            progress: 0,
            output_path: None,
            error_message: None,
            degraded_tracks: Vec::new(),
            cancel_requested: false,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Enter a pipeline stage, recording `started_at` on the first move
    /// out of Queued. Progress never moves backwards.
    pub fn enter_stage(&mut self, status: JobStatus, progress: u8) {
        if self.started_at.is_none() && status != JobStatus::Queued {
            self.started_at = Some(Utc::now());
        }
        self.status = status;
        self.set_progress(progress);
    }

    /// Update progress, clamped to 0-100 and monotonic.
    pub fn set_progress(&mut self, progress: u8) {
        self.progress = self.progress.max(progress.min(100));
    }

    /// Mark the job completed with its output artifact.
    pub fn complete(&mut self, output_path: PathBuf) {
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.output_path = Some(output_path);
        self.finished_at = Some(Utc::now());
    }

    /// Mark the job failed with a human-readable message.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error_message = Some(error.into());
        self.finished_at = Some(Utc::now());
    }
}
