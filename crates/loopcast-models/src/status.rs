//! Job status state machine.

use serde::{Deserialize, Serialize};

/// Pipeline stage a job is currently in.
///
/// Jobs move strictly forward through the staged states and terminate in
/// exactly one of `Completed` or `Failed`. `Failed` is reachable from every
/// non-terminal state; no transition ever revisits an earlier stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job accepted, waiting for an execution slot
    #[default]
    Queued,
    /// Fetching cover and track assets into the workspace
    Downloading,
    /// Probing track durations
    AnalyzingAudio,
    /// Building the loop-fill playlist manifest
    Composing,
    /// Running the external encoder
    Encoding,
    /// Finished successfully, output artifact available
    Completed,
    /// Finished with an error (or cancelled)
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Downloading => "downloading",
            JobStatus::AnalyzingAudio => "analyzing_audio",
            JobStatus::Composing => "composing",
            JobStatus::Encoding => "encoding",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more transitions expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Position of a state along the forward path, used to enforce
    /// monotonic transitions. Terminal states share the highest rank.
    fn rank(&self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Downloading => 1,
            JobStatus::AnalyzingAudio => 2,
            JobStatus::Composing => 3,
            JobStatus::Encoding => 4,
            JobStatus::Completed | JobStatus::Failed => 5,
        }
    }

    /// Whether a transition from `self` to `next` is legal.
    ///
    /// Legal transitions move strictly forward along the staged path, or
    /// jump to `Failed` from any non-terminal state. Terminal states accept
    /// nothing.
    pub fn can_transition(&self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == JobStatus::Failed {
            return true;
        }
        next.rank() > self.rank()
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
