//! Submitted job specification and encode presets.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// One audio track in the playlist.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TrackSpec {
    /// Source URL of the audio asset
    #[validate(url)]
    pub url: String,

    /// Duration declared by the submitter, in seconds. Used as a fallback
    /// when probing the downloaded file fails.
    #[validate(range(min = 0.0))]
    pub declared_duration_secs: f64,
}

/// A request to produce one fixed-duration video.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct JobSpec {
    /// Source URL of the cover image
    #[validate(url)]
    pub cover_url: String,

    /// Ordered playlist; looped and truncated to hit the target duration
    #[validate(length(min = 1), nested)]
    pub tracks: Vec<TrackSpec>,

    /// Exact duration of the output video, in seconds
    #[validate(range(exclusive_min = 0.0))]
    pub target_duration_secs: f64,

    /// Encode preset for the video composition step
    #[serde(default)]
    pub preset: EncodePreset,

    /// Webhook invoked at most once with the terminal outcome
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub notify_url: Option<String>,
}

/// Output quality preset.
///
/// The resolution, frame rate and rate control of the video composition
/// step are preset-driven rather than hardcoded per call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EncodePreset {
    /// 1280x720, CRF 23 — fast turnaround
    Draft,
    /// 1920x1080, CRF 20
    #[default]
    Standard,
    /// 1920x1080, CRF 17, slower x264 preset
    High,
}

impl EncodePreset {
    /// Output resolution as (width, height).
    pub fn resolution(&self) -> (u32, u32) {
        match self {
            EncodePreset::Draft => (1280, 720),
            EncodePreset::Standard | EncodePreset::High => (1920, 1080),
        }
    }

    /// Output frame rate. A static cover frame needs very few frames;
    /// low rates keep encode time and file size down.
    pub fn framerate(&self) -> u32 {
        match self {
            EncodePreset::Draft => 1,
            EncodePreset::Standard | EncodePreset::High => 2,
        }
    }

    /// x264 constant rate factor.
    pub fn crf(&self) -> u8 {
        match self {
            EncodePreset::Draft => 23,
            EncodePreset::Standard => 20,
            EncodePreset::High => 17,
        }
    }

    /// x264 speed preset.
    pub fn x264_preset(&self) -> &'static str {
        match self {
            EncodePreset::Draft => "veryfast",
            EncodePreset::Standard => "medium",
            EncodePreset::High => "slow",
        }
    }

    /// AAC audio bitrate.
    pub fn audio_bitrate(&self) -> &'static str {
        match self {
            EncodePreset::Draft => "128k",
            EncodePreset::Standard => "192k",
            EncodePreset::High => "256k",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EncodePreset::Draft => "draft",
            EncodePreset::Standard => "standard",
            EncodePreset::High => "high",
        }
    }
}
