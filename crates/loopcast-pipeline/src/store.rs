//! Concurrency-safe in-memory job registry.

use std::collections::HashMap;

use loopcast_models::{Job, JobId, JobSpec, JobStatus};
use tokio::sync::RwLock;
use tracing::warn;

/// Registry mapping job identifier to job record.
///
/// The only state shared across concurrent job pipelines. All mutation
/// happens under the write lock, so a single update (for example status
/// plus progress) is atomic; readers never observe a partial update.
/// Nothing here blocks on I/O external to the store.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new Queued job for a spec and return a snapshot of it.
    pub async fn create(&self, spec: JobSpec) -> Job {
        let job = Job::new(spec);
        self.jobs
            .write()
            .await
            .insert(job.id.clone(), job.clone());
        job
    }

    /// Snapshot of a job by id.
    pub async fn get(&self, id: &JobId) -> Option<Job> {
        self.jobs.read().await.get(id).cloned()
    }

    /// Snapshots of all jobs, optionally filtered by status, newest first.
    pub async fn list(&self, filter: Option<JobStatus>) -> Vec<Job> {
        let jobs = self.jobs.read().await;
        let mut out: Vec<Job> = jobs
            .values()
            .filter(|j| filter.is_none_or(|s| j.status == s))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    /// Apply a mutation to a job atomically, returning the updated
    /// snapshot, or `None` if the job doesn't exist.
    pub async fn update<F>(&self, id: &JobId, f: F) -> Option<Job>
    where
        F: FnOnce(&mut Job),
    {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(id)?;
        f(job);
        Some(job.clone())
    }

    /// Move a job to a pipeline stage, enforcing the state machine.
    ///
    /// Illegal transitions (backwards, or out of a terminal state) are
    /// logged and leave the record untouched; the returned snapshot shows
    /// what actually happened, so callers can detect a lost race with
    /// cancellation.
    pub async fn transition(&self, id: &JobId, status: JobStatus, progress: u8) -> Option<Job> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(id)?;
        if job.status.can_transition(status) {
            job.enter_stage(status, progress);
        } else {
            warn!(
                job_id = %id,
                from = %job.status,
                to = %status,
                "Ignoring illegal status transition"
            );
        }
        Some(job.clone())
    }

    /// Remove a job record.
    pub async fn delete(&self, id: &JobId) -> bool {
        self.jobs.write().await.remove(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loopcast_models::{EncodePreset, TrackSpec};
    use std::sync::Arc;

    fn sample_spec() -> JobSpec {
        JobSpec {
            cover_url: "https://example.com/cover.png".to_string(),
            tracks: vec![TrackSpec {
                url: "https://example.com/track.mp3".to_string(),
                declared_duration_secs: 60.0,
            }],
            target_duration_secs: 600.0,
            preset: EncodePreset::Standard,
            notify_url: None,
        }
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let store = JobStore::new();
        let job = store.create(sample_spec()).await;

        let fetched = store.get(&job.id).await.unwrap();
        assert_eq!(fetched.status, JobStatus::Queued);

        assert!(store.delete(&job.id).await);
        assert!(!store.delete(&job.id).await);
        assert!(store.get(&job.id).await.is_none());
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let store = JobStore::new();
        let a = store.create(sample_spec()).await;
        let _b = store.create(sample_spec()).await;

        store.transition(&a.id, JobStatus::Downloading, 10).await;

        assert_eq!(store.list(None).await.len(), 2);
        assert_eq!(store.list(Some(JobStatus::Queued)).await.len(), 1);
        assert_eq!(store.list(Some(JobStatus::Downloading)).await.len(), 1);
        assert_eq!(store.list(Some(JobStatus::Failed)).await.len(), 0);
    }

    #[tokio::test]
    async fn test_update_is_atomic_snapshot() {
        let store = JobStore::new();
        let job = store.create(sample_spec()).await;

        let updated = store
            .update(&job.id, |j| {
                j.enter_stage(JobStatus::Downloading, 10);
                j.degraded_tracks.push(0);
            })
            .await
            .unwrap();

        assert_eq!(updated.status, JobStatus::Downloading);
        assert_eq!(updated.degraded_tracks, vec![0]);
    }

    #[tokio::test]
    async fn test_transition_rejects_backwards_and_terminal() {
        let store = JobStore::new();
        let job = store.create(sample_spec()).await;

        store.transition(&job.id, JobStatus::Encoding, 60).await;
        let after = store.transition(&job.id, JobStatus::Downloading, 10).await.unwrap();
        assert_eq!(after.status, JobStatus::Encoding);

        store.update(&job.id, |j| j.fail("cancelled by caller")).await;
        let after = store.transition(&job.id, JobStatus::Completed, 100).await.unwrap();
        assert_eq!(after.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_concurrent_updates_do_not_interleave() {
        let store = Arc::new(JobStore::new());
        let job = store.create(sample_spec()).await;

        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = Arc::clone(&store);
            let id = job.id.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update(&id, |j| {
                        // Two fields written under one lock; readers must
                        // see both or neither
                        let n = j.degraded_tracks.len();
                        j.degraded_tracks.push(n);
                        j.set_progress((n + 1).min(99) as u8);
                    })
                    .await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let finished = store.get(&job.id).await.unwrap();
        assert_eq!(finished.degraded_tracks.len(), 50);
        // Each push recorded the length it observed, so the sequence is a
        // permutation-free 0..50 only if updates never interleaved
        let mut seen = finished.degraded_tracks.clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..50).collect::<Vec<_>>());
        assert_eq!(finished.progress, 50);
    }
}
