//! Job orchestration: state machine, admission gate, cleanup, notification.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use loopcast_media::{fetch_assets, move_file, JobWorkspace};
use loopcast_models::{Job, JobId, JobSpec, JobStatus};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use validator::Validate;

use crate::config::PipelineConfig;
use crate::encoder::{Encoder, FfmpegEncoder};
use crate::error::{PipelineError, PipelineResult};
use crate::notifier::Notifier;
use crate::store::JobStore;
use crate::{analyzer, composer};

/// Progress milestones per stage. Encoding progress moves through the
/// band up to 99 driven by the encoder's progress reports.
const PROGRESS_DOWNLOADING: u8 = 10;
const PROGRESS_FETCHED: u8 = 35;
const PROGRESS_ANALYZING: u8 = 40;
const PROGRESS_COMPOSING: u8 = 55;
const PROGRESS_ENCODING: u8 = 60;
const PROGRESS_AUDIO_DONE: u8 = 70;

/// The job pipeline.
///
/// `submit` validates a spec, registers a Queued job, and spawns its
/// pipeline; the configured concurrency ceiling is enforced by a
/// semaphore, so excess jobs hold in Queued until a slot frees. Each
/// job's stages run strictly sequentially; independent jobs run
/// concurrently.
pub struct Pipeline {
    config: PipelineConfig,
    store: Arc<JobStore>,
    encoder: Arc<dyn Encoder>,
    notifier: Notifier,
    http: reqwest::Client,
    admission: Arc<Semaphore>,
}

impl Pipeline {
    /// Create a pipeline driving ffmpeg.
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_encoder(config, Arc::new(FfmpegEncoder))
    }

    /// Create a pipeline with a custom encoder implementation.
    pub fn with_encoder(config: PipelineConfig, encoder: Arc<dyn Encoder>) -> Self {
        let http = reqwest::Client::new();
        let notifier = Notifier::new(http.clone(), config.notify_timeout);
        let admission = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        Self {
            config,
            store: Arc::new(JobStore::new()),
            encoder,
            notifier,
            http,
            admission,
        }
    }

    /// The job registry, for read-only queries.
    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Validate a spec, register the job, and start its pipeline.
    /// Returns the job id immediately; the pipeline runs asynchronously.
    pub async fn submit(self: &Arc<Self>, spec: JobSpec) -> PipelineResult<JobId> {
        spec.validate()
            .map_err(|e| PipelineError::InvalidSpec(e.to_string()))?;

        let job = self.store.create(spec).await;
        let id = job.id.clone();
        info!(job_id = %id, "Job submitted");

        let pipeline = Arc::clone(self);
        let job_id = id.clone();
        tokio::spawn(async move {
            pipeline.run_job(job_id).await;
        });

        Ok(id)
    }

    /// Snapshot of a job.
    pub async fn get(&self, id: &JobId) -> Option<Job> {
        self.store.get(id).await
    }

    /// Snapshots of jobs, optionally filtered by status.
    pub async fn list(&self, filter: Option<JobStatus>) -> Vec<Job> {
        self.store.list(filter).await
    }

    /// Request cancellation of a job.
    ///
    /// A non-terminal job transitions directly to Failed with a
    /// cancellation reason. An already-running external encode is not
    /// stopped; its job task observes the cancellation at the next stage
    /// boundary and proceeds straight to cleanup. Returns false for
    /// unknown or already-terminal jobs.
    pub async fn cancel(&self, id: &JobId) -> bool {
        let mut cancelled = false;
        self.store
            .update(id, |job| {
                job.cancel_requested = true;
                if !job.is_terminal() {
                    job.fail("cancelled by caller");
                    cancelled = true;
                }
            })
            .await;
        if cancelled {
            info!(job_id = %id, "Job cancelled");
        }
        cancelled
    }

    /// Submit a spec and wait for its terminal state — the synchronous
    /// convenience wrapper around submit-then-poll.
    pub async fn run_to_completion(self: &Arc<Self>, spec: JobSpec) -> PipelineResult<Job> {
        let id = self.submit(spec).await?;
        loop {
            match self.store.get(&id).await {
                Some(job) if job.is_terminal() => return Ok(job),
                Some(_) => tokio::time::sleep(Duration::from_millis(100)).await,
                None => return Err(PipelineError::NotFound(id)),
            }
        }
    }

    /// Drive one job from Queued to a terminal state, then clean up and
    /// notify. This is the only place terminal handling happens, so the
    /// workspace is deleted and the notifier fired exactly once per job.
    async fn run_job(self: Arc<Self>, id: JobId) {
        // Admission gate: hold a permit for the whole active phase
        let _permit = match Arc::clone(&self.admission).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                self.fail_if_active(&id, "admission gate closed").await;
                return;
            }
        };

        // The job may have been cancelled while Queued
        if self.ensure_active(&id).await.is_err() {
            self.finalize(&id, None).await;
            return;
        }

        self.store
            .transition(&id, JobStatus::Downloading, PROGRESS_DOWNLOADING)
            .await;

        let workspace =
            match JobWorkspace::create(&self.config.work_dir, id.as_str()).await {
                Ok(ws) => ws,
                Err(e) => {
                    self.fail_if_active(&id, format!("workspace creation failed: {e}"))
                        .await;
                    self.finalize(&id, None).await;
                    return;
                }
            };

        match self.execute_stages(&id, &workspace).await {
            Ok(output) => {
                // A cancellation can land between the final stage and this
                // update; the terminal record always wins
                self.store
                    .update(&id, |job| {
                        if !job.is_terminal() {
                            job.complete(output);
                        }
                    })
                    .await;
                info!(job_id = %id, "Job completed");
            }
            Err(PipelineError::Cancelled(_)) => {
                // Already Failed with the cancellation reason
                info!(job_id = %id, "Job stopped after cancellation");
            }
            Err(e) => {
                error!(job_id = %id, error = %e, "Job failed");
                self.fail_if_active(&id, e.to_string()).await;
            }
        }

        self.finalize(&id, Some(workspace)).await;
    }

    /// Run the stages between workspace creation and the terminal
    /// decision. Cancellation is observed at every stage boundary.
    async fn execute_stages(
        &self,
        id: &JobId,
        workspace: &JobWorkspace,
    ) -> PipelineResult<PathBuf> {
        let spec = self
            .store
            .get(id)
            .await
            .ok_or_else(|| PipelineError::NotFound(id.clone()))?
            .spec;

        // Downloading
        let assets = fetch_assets(
            &self.http,
            &spec,
            workspace,
            self.config.download_batch_size,
        )
        .await?;
        self.set_progress(id, PROGRESS_FETCHED).await;
        self.ensure_active(id).await?;

        // AnalyzingAudio
        self.store
            .transition(id, JobStatus::AnalyzingAudio, PROGRESS_ANALYZING)
            .await;
        let analyzed = analyzer::analyze_durations(&spec.tracks, &assets.track_paths).await?;
        if !analyzed.degraded.is_empty() {
            let degraded = analyzed.degraded.clone();
            self.store
                .update(id, |job| {
                    if !job.is_terminal() {
                        job.degraded_tracks = degraded;
                    }
                })
                .await;
        }
        self.ensure_active(id).await?;

        // Composing
        self.store
            .transition(id, JobStatus::Composing, PROGRESS_COMPOSING)
            .await;
        let manifest = composer::compose_manifest(&analyzed.chosen, spec.target_duration_secs)?;
        self.ensure_active(id).await?;

        // Encoding: audio assembly, then video composition
        self.store
            .transition(id, JobStatus::Encoding, PROGRESS_ENCODING)
            .await;
        let audio = self
            .encoder
            .assemble_audio(workspace, &manifest, &assets.track_paths, spec.preset)
            .await?;
        self.set_progress(id, PROGRESS_AUDIO_DONE).await;
        self.ensure_active(id).await?;

        let progress_store = Arc::clone(&self.store);
        let progress_id = id.clone();
        let target = spec.target_duration_secs;
        let video = self
            .encoder
            .compose_video(
                workspace,
                &assets.cover_path,
                &audio,
                target,
                spec.preset,
                Box::new(move |p| {
                    let band = PROGRESS_AUDIO_DONE as f64
                        + p.fraction_of(target) * (99.0 - PROGRESS_AUDIO_DONE as f64);
                    let store = Arc::clone(&progress_store);
                    let id = progress_id.clone();
                    tokio::spawn(async move {
                        store
                            .update(&id, |job| {
                                if !job.is_terminal() {
                                    job.set_progress(band as u8);
                                }
                            })
                            .await;
                    });
                }),
            )
            .await?;

        // Move the artifact to its permanent location
        let output = self.config.output_dir.join(format!("{id}.mp4"));
        move_file(&video, &output).await?;
        Ok(output)
    }

    /// Bump progress unless the job already reached a terminal state
    /// (a cancellation may have raced the running stage).
    async fn set_progress(&self, id: &JobId, progress: u8) {
        self.store
            .update(id, |job| {
                if !job.is_terminal() {
                    job.set_progress(progress);
                }
            })
            .await;
    }

    /// Error out unless the job is still running and uncancelled.
    async fn ensure_active(&self, id: &JobId) -> PipelineResult<()> {
        match self.store.get(id).await {
            None => Err(PipelineError::NotFound(id.clone())),
            Some(job) if job.cancel_requested || job.is_terminal() => {
                Err(PipelineError::cancelled(format!("job {id} is no longer active")))
            }
            Some(_) => Ok(()),
        }
    }

    /// Fail the job unless it already reached a terminal state.
    async fn fail_if_active(&self, id: &JobId, message: impl Into<String>) {
        let message = message.into();
        self.store
            .update(id, |job| {
                if !job.is_terminal() {
                    job.fail(message);
                }
            })
            .await;
    }

    /// Unconditional terminal handling: delete the workspace (failure is
    /// logged, non-fatal) and fire the notifier at most once.
    async fn finalize(&self, id: &JobId, workspace: Option<JobWorkspace>) {
        if let Some(workspace) = workspace {
            let root = workspace.root().to_path_buf();
            if let Err(e) = workspace.cleanup().await {
                warn!(
                    job_id = %id,
                    workspace = %root.display(),
                    error = %e,
                    "Workspace cleanup failed"
                );
            }
        }

        if let Some(job) = self.store.get(id).await {
            self.notifier.notify(&job).await;
        }
    }
}
