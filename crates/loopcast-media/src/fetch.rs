//! HTTP asset fetching with cover validation and bounded-batch downloads.

use std::path::PathBuf;

use futures::future::join_all;
use loopcast_models::JobSpec;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};
use crate::workspace::JobWorkspace;

/// Paths of everything the fetcher placed in the workspace.
#[derive(Debug, Clone)]
pub struct FetchedAssets {
    pub cover_path: PathBuf,
    /// Track files aligned to the spec's playlist order
    pub track_paths: Vec<PathBuf>,
}

/// Fetch the cover image and every playlist track into the workspace.
///
/// The cover is fetched and validated first; tracks are only attempted
/// once the cover passed both checks. Track downloads run in batches of
/// `batch_size` to cap simultaneous connections. Any single failure
/// aborts the whole fetch, since a partial asset set is unusable
/// downstream.
pub async fn fetch_assets(
    client: &reqwest::Client,
    spec: &JobSpec,
    workspace: &JobWorkspace,
    batch_size: usize,
) -> MediaResult<FetchedAssets> {
    let cover_path = fetch_cover(client, &spec.cover_url, workspace).await?;

    let batch_size = batch_size.max(1);
    let mut track_paths: Vec<PathBuf> = Vec::with_capacity(spec.tracks.len());
    let indexed: Vec<(usize, &str)> = spec
        .tracks
        .iter()
        .enumerate()
        .map(|(i, t)| (i, t.url.as_str()))
        .collect();

    for batch in indexed.chunks(batch_size) {
        let downloads = batch.iter().map(|(index, url)| {
            let path = workspace.track_path(*index, &extension_from_url(url));
            async move {
                download_to_file(client, url, &path).await?;
                Ok::<PathBuf, MediaError>(path)
            }
        });

        for result in join_all(downloads).await {
            track_paths.push(result?);
        }
        debug!(
            fetched = track_paths.len(),
            total = spec.tracks.len(),
            "Track download batch complete"
        );
    }

    info!(
        tracks = track_paths.len(),
        cover = %cover_path.display(),
        "Fetched all job assets"
    );

    Ok(FetchedAssets {
        cover_path,
        track_paths,
    })
}

/// Fetch and validate the cover image.
///
/// Two independent checks, both required: the response's declared media
/// type must be an image type, and the leading bytes must match a known
/// image signature. Content-type headers alone are not trusted.
async fn fetch_cover(
    client: &reqwest::Client,
    url: &str,
    workspace: &JobWorkspace,
) -> MediaResult<PathBuf> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| MediaError::download_failed(format!("cover request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(MediaError::download_failed(format!(
            "cover fetch returned HTTP {}",
            response.status()
        )));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !content_type.trim_start().starts_with("image/") {
        return Err(MediaError::invalid_asset(format!(
            "cover content-type '{content_type}' is not an image type"
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| MediaError::download_failed(format!("cover body read failed: {e}")))?;

    let ext = image_signature(&bytes).ok_or_else(|| {
        MediaError::invalid_asset("cover bytes do not match a known image signature")
    })?;

    let path = workspace.cover_path(ext);
    tokio::fs::write(&path, &bytes).await?;
    debug!(cover = %path.display(), format = ext, "Cover validated and stored");
    Ok(path)
}

/// Download one asset to a workspace file.
async fn download_to_file(
    client: &reqwest::Client,
    url: &str,
    path: &std::path::Path,
) -> MediaResult<()> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| MediaError::download_failed(format!("request to {url} failed: {e}")))?;

    if !response.status().is_success() {
        return Err(MediaError::download_failed(format!(
            "{url} returned HTTP {}",
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| MediaError::download_failed(format!("body read from {url} failed: {e}")))?;

    if bytes.is_empty() {
        warn!(url = url, "Downloaded asset is empty");
        return Err(MediaError::download_failed(format!("{url} returned an empty body")));
    }

    tokio::fs::write(path, &bytes).await?;
    Ok(())
}

/// Identify an image by its leading bytes, returning a file extension.
fn image_signature(bytes: &[u8]) -> Option<&'static str> {
    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];

    if bytes.starts_with(PNG) {
        Some("png")
    } else if bytes.starts_with(JPEG) {
        Some("jpg")
    } else if bytes.starts_with(b"GIF8") {
        Some("gif")
    } else if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        Some("webp")
    } else {
        None
    }
}

/// File extension from a URL path, for naming downloaded tracks.
fn extension_from_url(raw: &str) -> String {
    url::Url::parse(raw)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back())
                .and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext.to_string()))
        })
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "mp3".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use loopcast_models::{EncodePreset, TrackSpec};
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PNG_HEADER: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn spec(cover_url: String, track_urls: Vec<String>) -> JobSpec {
        JobSpec {
            cover_url,
            tracks: track_urls
                .into_iter()
                .map(|url| TrackSpec {
                    url,
                    declared_duration_secs: 60.0,
                })
                .collect(),
            target_duration_secs: 600.0,
            preset: EncodePreset::Standard,
            notify_url: None,
        }
    }

    #[test]
    fn test_image_signature_detection() {
        assert_eq!(image_signature(PNG_HEADER), Some("png"));
        assert_eq!(image_signature(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("jpg"));
        assert_eq!(image_signature(b"GIF89a...."), Some("gif"));
        assert_eq!(image_signature(b"RIFF\x00\x00\x00\x00WEBPVP8 "), Some("webp"));
        assert_eq!(image_signature(b"<html><body>"), None);
        assert_eq!(image_signature(b""), None);
    }

    #[test]
    fn test_extension_from_url() {
        assert_eq!(extension_from_url("https://cdn.example.com/a/track.mp3"), "mp3");
        assert_eq!(extension_from_url("https://x.com/song.FLAC?sig=abc"), "flac");
        assert_eq!(extension_from_url("https://x.com/stream"), "mp3");
        assert_eq!(extension_from_url("https://x.com/odd.name.opus#frag"), "opus");
    }

    #[tokio::test]
    async fn test_html_cover_fails_before_any_track_download() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/cover"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<html>not an image</html>"),
            )
            .mount(&server)
            .await;

        // Fail-fast ordering: the track endpoint must never be hit
        Mock::given(method("GET"))
            .and(path("/track0"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let ws = JobWorkspace::create(dir.path(), "t").await.unwrap();
        let client = reqwest::Client::new();
        let spec = spec(
            format!("{}/cover", server.uri()),
            vec![format!("{}/track0", server.uri())],
        );

        let err = fetch_assets(&client, &spec, &ws, 3).await.unwrap_err();
        assert!(matches!(err, MediaError::InvalidAsset(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_image_content_type_with_non_image_bytes_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/cover"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_string("<html>spoofed</html>"),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let ws = JobWorkspace::create(dir.path(), "t").await.unwrap();
        let client = reqwest::Client::new();
        let spec = spec(format!("{}/cover", server.uri()), vec![]);

        let err = fetch_assets(&client, &spec, &ws, 3).await.unwrap_err();
        assert!(matches!(err, MediaError::InvalidAsset(_)));
    }

    #[tokio::test]
    async fn test_fetch_cover_and_tracks_in_batches() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/cover"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(PNG_HEADER),
            )
            .mount(&server)
            .await;

        for i in 0..5 {
            Mock::given(method("GET"))
                .and(path(format!("/track{i}.mp3")))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 16]))
                .expect(1)
                .mount(&server)
                .await;
        }

        let dir = TempDir::new().unwrap();
        let ws = JobWorkspace::create(dir.path(), "t").await.unwrap();
        let client = reqwest::Client::new();
        let spec = spec(
            format!("{}/cover", server.uri()),
            (0..5).map(|i| format!("{}/track{i}.mp3", server.uri())).collect(),
        );

        let assets = fetch_assets(&client, &spec, &ws, 2).await.unwrap();
        assert!(assets.cover_path.ends_with("cover.png"));
        assert_eq!(assets.track_paths.len(), 5);
        for (i, p) in assets.track_paths.iter().enumerate() {
            assert!(p.ends_with(format!("track_{i:03}.mp3")), "{}", p.display());
            assert!(p.exists());
        }
    }

    #[tokio::test]
    async fn test_track_http_error_aborts_fetch() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/cover"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/jpeg")
                    .set_body_bytes(&[0xFF, 0xD8, 0xFF, 0xE0][..]),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/good.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 8]))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/missing.mp3"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let ws = JobWorkspace::create(dir.path(), "t").await.unwrap();
        let client = reqwest::Client::new();
        let spec = spec(
            format!("{}/cover", server.uri()),
            vec![
                format!("{}/good.mp3", server.uri()),
                format!("{}/missing.mp3", server.uri()),
            ],
        );

        let err = fetch_assets(&client, &spec, &ws, 4).await.unwrap_err();
        assert!(matches!(err, MediaError::DownloadFailed { .. }));
    }
}
