//! Shared data models for the Loopcast pipeline.
//!
//! This crate defines the job record and its status state machine, the
//! submitted job spec, and the playlist manifest produced by the composer.

pub mod job;
pub mod manifest;
pub mod spec;
pub mod status;

pub use job::{Job, JobId};
pub use manifest::{ManifestEntry, PlaylistManifest};
pub use spec::{EncodePreset, JobSpec, TrackSpec};
pub use status::JobStatus;
