//! The Loopcast job pipeline.
//!
//! Turns a validated job spec (cover image + ordered playlist + exact
//! target duration) into a finished video: asset acquisition, duration
//! reconciliation, loop-fill composition, two external encoder
//! invocations, and a job status state machine with unconditional
//! cleanup and best-effort notification.

pub mod analyzer;
pub mod composer;
pub mod config;
pub mod encoder;
pub mod error;
pub mod notifier;
pub mod orchestrator;
pub mod store;

pub use config::PipelineConfig;
pub use encoder::{Encoder, FfmpegEncoder};
pub use error::{PipelineError, PipelineResult};
pub use orchestrator::Pipeline;
pub use store::JobStore;

pub use loopcast_models::{Job, JobId, JobSpec, JobStatus, TrackSpec};
