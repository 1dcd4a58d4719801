//! The two encoder invocations: audio assembly and video composition.

use std::path::{Path, PathBuf};

use loopcast_models::{EncodePreset, PlaylistManifest};
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::progress::EncodeProgress;

/// Write the concat demuxer list realizing a playlist manifest.
///
/// Each manifest entry becomes one `file` directive referencing the
/// track's workspace file; looping is expressed by repetition. The final
/// truncation is applied by the `-t` trim on the assembly invocation, so
/// entries never need in/out points.
pub async fn write_concat_list(
    list_path: impl AsRef<Path>,
    manifest: &PlaylistManifest,
    track_paths: &[PathBuf],
) -> MediaResult<PathBuf> {
    let list_path = list_path.as_ref();

    let mut contents = String::from("ffconcat version 1.0\n");
    for entry in &manifest.entries {
        let path = &track_paths[entry.track_index];
        contents.push_str(&format!("file '{}'\n", escape_concat_path(path)));
    }

    tokio::fs::write(list_path, contents).await?;
    Ok(list_path.to_path_buf())
}

/// Quote a path for a concat list `file` directive.
///
/// Single quotes inside the path are closed, escaped, and reopened,
/// which is the quoting ffmpeg's concat demuxer expects.
fn escape_concat_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}

/// Assemble the manifest into a single AAC track trimmed to exactly
/// `target_secs`.
pub async fn assemble_audio(
    list_path: &Path,
    output: &Path,
    target_secs: f64,
    preset: EncodePreset,
) -> MediaResult<()> {
    let cmd = audio_assembly_command(list_path, output, target_secs, preset);
    FfmpegRunner::new().run(&cmd).await?;
    info!(output = %output.display(), "Assembled audio track");
    Ok(())
}

/// Build the audio-assembly command.
pub fn audio_assembly_command(
    list_path: &Path,
    output: &Path,
    target_secs: f64,
    preset: EncodePreset,
) -> FfmpegCommand {
    FfmpegCommand::new(output)
        .input_with_args(list_path, ["-f", "concat", "-safe", "0"])
        .output_arg("-vn")
        .audio_codec("aac")
        .audio_bitrate(preset.audio_bitrate())
        .duration(target_secs)
}

/// Compose the final video: the cover looped as a static frame over the
/// assembled audio, trimmed to exactly `target_secs`, laid out for
/// progressive playback.
pub async fn compose_video<F>(
    cover: &Path,
    audio: &Path,
    output: &Path,
    target_secs: f64,
    preset: EncodePreset,
    progress_callback: F,
) -> MediaResult<()>
where
    F: Fn(EncodeProgress) + Send + 'static,
{
    let cmd = video_composition_command(cover, audio, output, target_secs, preset);
    FfmpegRunner::new()
        .run_with_progress(&cmd, progress_callback)
        .await?;
    info!(output = %output.display(), "Composed video");
    Ok(())
}

/// Build the video-composition command.
pub fn video_composition_command(
    cover: &Path,
    audio: &Path,
    output: &Path,
    target_secs: f64,
    preset: EncodePreset,
) -> FfmpegCommand {
    let (width, height) = preset.resolution();
    // Fit the cover inside the target frame, pad to exact size, and force
    // an even-dimensioned yuv420p frame for x264
    let scale = format!(
        "scale={width}:{height}:force_original_aspect_ratio=decrease,\
         pad={width}:{height}:(ow-iw)/2:(oh-ih)/2,format=yuv420p"
    );

    FfmpegCommand::new(output)
        .input_with_args(cover, ["-loop", "1", "-framerate", &preset.framerate().to_string()])
        .input(audio)
        .video_codec("libx264")
        .output_args(["-tune", "stillimage"])
        .preset(preset.x264_preset())
        .crf(preset.crf())
        .video_filter(scale)
        .audio_codec("copy")
        .output_args(["-movflags", "+faststart"])
        .duration(target_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use loopcast_models::ManifestEntry;
    use tempfile::TempDir;

    fn manifest(entries: Vec<(usize, f64)>, target: f64) -> PlaylistManifest {
        PlaylistManifest {
            entries: entries
                .into_iter()
                .map(|(track_index, included_secs)| ManifestEntry {
                    track_index,
                    included_secs,
                })
                .collect(),
            target_secs: target,
        }
    }

    #[tokio::test]
    async fn test_concat_list_repeats_looped_tracks() {
        let dir = TempDir::new().unwrap();
        let tracks = vec![
            dir.path().join("track_000.mp3"),
            dir.path().join("track_001.mp3"),
        ];
        let m = manifest(vec![(0, 500.0), (1, 500.0), (0, 500.0), (1, 300.0)], 1800.0);

        let list = write_concat_list(dir.path().join("list.ffconcat"), &m, &tracks)
            .await
            .unwrap();
        let contents = tokio::fs::read_to_string(&list).await.unwrap();

        assert!(contents.starts_with("ffconcat version 1.0\n"));
        assert_eq!(contents.matches("track_000.mp3").count(), 2);
        assert_eq!(contents.matches("track_001.mp3").count(), 2);
        assert_eq!(contents.lines().count(), 5);
    }

    #[test]
    fn test_escape_concat_path() {
        let path = PathBuf::from("/tmp/it's here/track.mp3");
        assert_eq!(escape_concat_path(&path), r"/tmp/it'\''s here/track.mp3");
    }

    #[test]
    fn test_audio_assembly_command_shape() {
        let cmd = audio_assembly_command(
            Path::new("playlist.ffconcat"),
            Path::new("audio.m4a"),
            1800.0,
            EncodePreset::Standard,
        );
        let args = cmd.build_args();
        let f_pos = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[f_pos + 1], "concat");
        assert!(args.contains(&"-safe".to_string()));
        assert!(args.contains(&"aac".to_string()));
        assert!(args.contains(&"-vn".to_string()));
        assert!(args.contains(&"1800.000".to_string()));
    }

    #[test]
    fn test_video_composition_command_shape() {
        let cmd = video_composition_command(
            Path::new("cover.png"),
            Path::new("audio.m4a"),
            Path::new("out.mp4"),
            600.0,
            EncodePreset::Draft,
        );
        let args = cmd.build_args();
        assert!(args.contains(&"-loop".to_string()));
        assert!(args.contains(&"libx264".to_string()));
        assert!(args.contains(&"stillimage".to_string()));
        assert!(args.contains(&"+faststart".to_string()));
        assert!(args.contains(&"600.000".to_string()));
        // Draft preset resolution flows into the filter
        let vf = args
            .iter()
            .position(|a| a == "-vf")
            .map(|i| args[i + 1].clone())
            .unwrap();
        assert!(vf.contains("1280:720"));
    }
}
