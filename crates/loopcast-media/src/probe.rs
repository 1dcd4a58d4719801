//! FFprobe duration probing for audio tracks.

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

/// FFprobe JSON output format.
#[derive(Debug, serde::Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, serde::Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct FfprobeStream {
    codec_type: String,
    duration: Option<String>,
}

/// Probe a media file for its authoritative duration in seconds.
///
/// The container duration is preferred; if the format block carries none,
/// the first audio stream's duration is used. A file with neither is a
/// `ProbeFailed` (callers fall back to declared metadata).
pub async fn probe_duration(path: impl AsRef<Path>) -> MediaResult<f64> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::probe_failed(
            format!("ffprobe failed for {}", path.display()),
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
        ));
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;

    let duration = probe
        .format
        .duration
        .as_deref()
        .and_then(parse_duration)
        .or_else(|| {
            probe
                .streams
                .iter()
                .find(|s| s.codec_type == "audio")
                .and_then(|s| s.duration.as_deref())
                .and_then(parse_duration)
        });

    duration.ok_or_else(|| {
        MediaError::probe_failed(
            format!("no duration reported for {}", path.display()),
            None,
        )
    })
}

fn parse_duration(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|d| d.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("62.5"), Some(62.5));
        assert_eq!(parse_duration("0.0"), Some(0.0));
        assert_eq!(parse_duration("N/A"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn test_probe_output_deserializes() {
        let json = r#"{
            "format": {"duration": "125.04"},
            "streams": [{"codec_type": "audio", "duration": "125.0"}]
        }"#;
        let probe: FfprobeOutput = serde_json::from_str(json).unwrap();
        assert_eq!(probe.format.duration.as_deref(), Some("125.04"));
        assert_eq!(probe.streams.len(), 1);
    }

    #[test]
    fn test_probe_output_without_format_duration() {
        let json = r#"{
            "format": {},
            "streams": [{"codec_type": "audio", "duration": "40.2"}]
        }"#;
        let probe: FfprobeOutput = serde_json::from_str(json).unwrap();
        assert!(probe.format.duration.is_none());
        assert_eq!(probe.streams[0].duration.as_deref(), Some("40.2"));
    }

    #[tokio::test]
    async fn test_probe_missing_file_is_file_not_found() {
        let err = probe_duration("/nonexistent/track.mp3").await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
