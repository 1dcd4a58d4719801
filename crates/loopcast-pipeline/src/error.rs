//! Pipeline error types.

use thiserror::Error;

use loopcast_media::MediaError;
use loopcast_models::JobId;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors surfaced by the job pipeline.
///
/// Everything here is fatal for its job except where noted; probe
/// failures and cleanup failures are absorbed and logged where they
/// occur and never reach this type.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Download failed: {0}")]
    Download(String),

    #[error("Invalid asset: {0}")]
    InvalidAsset(String),

    #[error("Composition failed: {0}")]
    Composition(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Job cancelled: {0}")]
    Cancelled(String),

    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Invalid job spec: {0}")]
    InvalidSpec(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn composition(msg: impl Into<String>) -> Self {
        Self::Composition(msg.into())
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }
}

impl From<MediaError> for PipelineError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::InvalidAsset(msg) => PipelineError::InvalidAsset(msg),
            MediaError::DownloadFailed { message } => PipelineError::Download(message),
            MediaError::Http(e) => PipelineError::Download(e.to_string()),
            MediaError::FfmpegFailed {
                message,
                stderr,
                exit_code,
            } => {
                let detail = match (stderr, exit_code) {
                    (Some(s), Some(code)) => format!("{message} (exit {code}): {s}"),
                    (Some(s), None) => format!("{message}: {s}"),
                    (None, Some(code)) => format!("{message} (exit {code})"),
                    (None, None) => message,
                };
                PipelineError::Encoding(detail)
            }
            MediaError::FfmpegNotFound | MediaError::FfprobeNotFound => {
                PipelineError::Encoding(err.to_string())
            }
            other => PipelineError::Encoding(other.to_string()),
        }
    }
}
