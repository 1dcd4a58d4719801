//! Parsing of FFmpeg `-progress pipe:2` output.

use serde::{Deserialize, Serialize};

/// Snapshot of an in-flight encode, assembled from FFmpeg's periodic
/// `-progress` key/value blocks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncodeProgress {
    /// Output timestamp in milliseconds
    pub out_time_ms: i64,
    /// Output timestamp as HH:MM:SS.micros
    pub out_time: String,
    /// Encoding speed relative to realtime (e.g. 1.5 for "1.5x")
    pub speed: f64,
    /// Whether FFmpeg reported `progress=end`
    pub is_complete: bool,
}

impl EncodeProgress {
    /// Output position in seconds.
    pub fn out_secs(&self) -> f64 {
        self.out_time_ms as f64 / 1000.0
    }

    /// Fraction of a target duration already written, clamped to 1.0.
    pub fn fraction_of(&self, target_secs: f64) -> f64 {
        if target_secs <= 0.0 {
            return 0.0;
        }
        (self.out_secs() / target_secs).min(1.0)
    }
}

/// Parse one line of `-progress` output into `current`, returning a
/// snapshot whenever a block ends (the `progress=` key).
pub(crate) fn parse_progress_line(line: &str, current: &mut EncodeProgress) -> Option<EncodeProgress> {
    let line = line.trim();

    if let Some((key, value)) = line.split_once('=') {
        match key {
            "out_time_ms" | "out_time_us" => {
                // Both keys report microseconds in modern FFmpeg
                if let Ok(us) = value.parse::<i64>() {
                    current.out_time_ms = us / 1000;
                }
            }
            "out_time" => {
                current.out_time = value.to_string();
            }
            "speed" => {
                if value != "N/A" {
                    if let Some(speed_str) = value.strip_suffix('x') {
                        if let Ok(speed) = speed_str.parse() {
                            current.speed = speed;
                        }
                    }
                }
            }
            "progress" => {
                if value == "end" {
                    current.is_complete = true;
                }
                return Some(current.clone());
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_parsing() {
        let mut progress = EncodeProgress::default();

        assert!(parse_progress_line("out_time_us=5000000", &mut progress).is_none());
        assert_eq!(progress.out_time_ms, 5000);

        parse_progress_line("speed=1.5x", &mut progress);
        assert!((progress.speed - 1.5).abs() < 0.01);

        let snapshot = parse_progress_line("progress=continue", &mut progress);
        assert!(snapshot.is_some());
        assert!(!snapshot.unwrap().is_complete);

        let snapshot = parse_progress_line("progress=end", &mut progress);
        assert!(snapshot.is_some());
        assert!(progress.is_complete);
    }

    #[test]
    fn test_fraction_of_target() {
        let progress = EncodeProgress {
            out_time_ms: 900_000,
            ..Default::default()
        };
        assert!((progress.fraction_of(1800.0) - 0.5).abs() < 1e-9);
        assert_eq!(progress.fraction_of(0.0), 0.0);

        let over = EncodeProgress {
            out_time_ms: 2_000_000,
            ..Default::default()
        };
        assert_eq!(over.fraction_of(1800.0), 1.0);
    }

    #[test]
    fn test_non_progress_lines_ignored() {
        let mut progress = EncodeProgress::default();
        assert!(parse_progress_line("[aac @ 0x55] some warning", &mut progress).is_none());
        assert!(parse_progress_line("", &mut progress).is_none());
    }
}
