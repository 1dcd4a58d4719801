//! Loop-fill playlist composition.

use loopcast_models::{ManifestEntry, PlaylistManifest};
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};

/// Build the ordered manifest whose included durations sum to exactly
/// `target_secs`.
///
/// Walks the track sequence from index 0, wrapping around as many full
/// cycles as needed. A track that fits in the remaining time is included
/// whole; the first track that does not fit is truncated to the exact
/// remainder and terminates the manifest. The truncated entry is computed
/// as `target - running`, so the sum is exact by construction rather than
/// by accumulation.
///
/// Callers guarantee at least one positive duration (the duration
/// analyzer rejects degenerate playlists); the empty and all-zero cases
/// are still rejected here so the loop provably terminates.
pub fn compose_manifest(
    chosen_durations: &[f64],
    target_secs: f64,
) -> PipelineResult<PlaylistManifest> {
    if target_secs <= 0.0 {
        return Err(PipelineError::composition(format!(
            "target duration must be positive, got {target_secs}"
        )));
    }
    if chosen_durations.is_empty() {
        return Err(PipelineError::composition("empty track list"));
    }
    let cycle_secs: f64 = chosen_durations.iter().filter(|d| **d > 0.0).sum();
    if cycle_secs <= 0.0 {
        return Err(PipelineError::composition(
            "every track has a non-positive chosen duration",
        ));
    }

    let mut entries = Vec::new();
    let mut running = 0.0_f64;

    'fill: loop {
        for (track_index, &duration) in chosen_durations.iter().enumerate() {
            // Non-positive durations never appear in the manifest; the
            // positive cycle sum above guarantees forward progress
            if duration <= 0.0 {
                continue;
            }

            let remaining = target_secs - running;
            if duration < remaining {
                entries.push(ManifestEntry {
                    track_index,
                    included_secs: duration,
                });
                running += duration;
            } else {
                entries.push(ManifestEntry {
                    track_index,
                    included_secs: remaining,
                });
                break 'fill;
            }
        }
    }

    debug!(
        entries = entries.len(),
        target_secs,
        cycle_secs,
        "Composed playlist manifest"
    );

    Ok(PlaylistManifest {
        entries,
        target_secs,
    })
}
