//! Duration analysis with declared-metadata fallback.

use std::path::PathBuf;

use loopcast_models::TrackSpec;
use tracing::{info, warn};

use crate::error::{PipelineError, PipelineResult};

/// Result of analyzing a job's fetched tracks.
#[derive(Debug, Clone)]
pub struct AnalyzedDurations {
    /// Chosen duration per track, aligned to playlist order
    pub chosen: Vec<f64>,
    /// Indices of tracks that fell back to the declared duration
    pub degraded: Vec<usize>,
}

/// Determine the chosen duration for every fetched track.
///
/// The probed duration is authoritative; when probing fails the declared
/// duration from the request is used instead and the track is recorded as
/// degraded (logged, non-fatal). A chosen duration that is not positive
/// is fatal for the job: it would make the loop-fill computation
/// non-terminating.
pub async fn analyze_durations(
    tracks: &[TrackSpec],
    track_paths: &[PathBuf],
) -> PipelineResult<AnalyzedDurations> {
    let mut chosen = Vec::with_capacity(tracks.len());
    let mut degraded = Vec::new();

    for (index, (track, path)) in tracks.iter().zip(track_paths).enumerate() {
        let duration = match loopcast_media::probe_duration(path).await {
            Ok(probed) => probed,
            Err(e) => {
                warn!(
                    track = index,
                    declared = track.declared_duration_secs,
                    error = %e,
                    "Probe failed, falling back to declared duration"
                );
                degraded.push(index);
                track.declared_duration_secs
            }
        };

        if duration <= 0.0 {
            return Err(PipelineError::composition(format!(
                "track {index} has non-positive duration {duration}"
            )));
        }
        chosen.push(duration);
    }

    if !degraded.is_empty() {
        info!(
            degraded = degraded.len(),
            total = tracks.len(),
            "Job running in degraded-accuracy mode for some tracks"
        );
    }

    Ok(AnalyzedDurations { chosen, degraded })
}
