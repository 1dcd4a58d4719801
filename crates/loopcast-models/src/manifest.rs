//! Playlist manifest driving audio assembly.

use serde::{Deserialize, Serialize};

/// One entry of the loop-fill manifest: a track (by playlist index) and
/// how much of it is included. `included_secs` equals the track's chosen
/// duration for every entry except possibly the final, truncated one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Index into the job's ordered track list
    pub track_index: usize,
    /// Seconds of this track included in the output
    pub included_secs: f64,
}

/// Ordered manifest whose included durations sum to exactly the target
/// duration. Built once per job and consumed by the audio-assembly
/// invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistManifest {
    pub entries: Vec<ManifestEntry>,
    /// Target duration the entries sum to
    pub target_secs: f64,
}

impl PlaylistManifest {
    /// Sum of included durations across all entries.
    pub fn total_secs(&self) -> f64 {
        self.entries.iter().map(|e| e.included_secs).sum()
    }

    /// Whether the final entry was truncated (included less than a full
    /// pass of its track would have).
    pub fn is_truncated(&self, chosen_durations: &[f64]) -> bool {
        match self.entries.last() {
            Some(last) => {
                chosen_durations
                    .get(last.track_index)
                    .is_some_and(|d| last.included_secs < *d)
            }
            None => false,
        }
    }
}
