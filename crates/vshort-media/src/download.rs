//! Video and subtitle download using yt-dlp.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{DownloadFailureKind, MediaError, MediaResult};

/// Base name of the downloaded source inside the run directory.
const SOURCE_STEM: &str = "source";

/// Base name of downloaded subtitle files.
const SUBTITLE_STEM: &str = "subs";

/// Subtitle languages requested from yt-dlp, in preference order.
const SUBTITLE_LANGS: &str = "en,en-US,en-GB";

/// Download a video from URL into `output_dir` using yt-dlp.
///
/// Files larger than `max_bytes` are refused by yt-dlp itself
/// (`--max-filesize`), which reports success without writing anything; that
/// case is mapped to [`DownloadFailureKind::TooLarge`].
pub async fn download_video(url: &str, output_dir: impl AsRef<Path>, max_bytes: u64) -> MediaResult<PathBuf> {
    let output_dir = output_dir.as_ref();

    which::which("yt-dlp").map_err(|_| MediaError::YtDlpNotFound)?;

    info!(url = %url, dir = %output_dir.display(), "Downloading video");

    let template = output_dir.join(format!("{}.%(ext)s", SOURCE_STEM));
    let template = template.to_string_lossy().to_string();
    let max_filesize = max_bytes.to_string();

    let args = [
        "--no-playlist",
        "--no-progress",
        "--max-filesize",
        max_filesize.as_str(),
        "-f",
        "bestvideo[ext=mp4][height<=1080]+bestaudio[ext=m4a]/best[ext=mp4]/best",
        "--merge-output-format",
        "mp4",
        "-o",
        template.as_str(),
        url,
    ];

    let output = Command::new("yt-dlp")
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if !output.status.success() {
        debug!("yt-dlp stderr: {}", stderr);
        let kind = classify_ytdlp_output(&stderr);
        let last = stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("Unknown error");
        warn!(url = %url, kind = %kind, "yt-dlp download failed");
        return Err(MediaError::download_failed(kind, format!("yt-dlp failed: {}", last.trim())));
    }

    match find_downloaded(output_dir, SOURCE_STEM, |ext| ext != "part" && ext != "ytdl").await? {
        Some(path) => {
            let size = tokio::fs::metadata(&path).await?.len();
            info!(
                output = %path.display(),
                size_mb = size as f64 / (1024.0 * 1024.0),
                "Downloaded video successfully"
            );
            Ok(path)
        }
        None => {
            let kind = match classify_ytdlp_output(&format!("{}\n{}", stdout, stderr)) {
                DownloadFailureKind::Other => DownloadFailureKind::NotFound,
                kind => kind,
            };
            Err(MediaError::download_failed(kind, "yt-dlp produced no output file"))
        }
    }
}

/// Download subtitles (manual or automatic) as VTT without the video.
///
/// Returns `None` when the video has no captions in a supported language.
pub async fn download_subtitles(url: &str, output_dir: impl AsRef<Path>) -> MediaResult<Option<PathBuf>> {
    let output_dir = output_dir.as_ref();

    which::which("yt-dlp").map_err(|_| MediaError::YtDlpNotFound)?;

    let template = output_dir.join(SUBTITLE_STEM);
    let template = template.to_string_lossy().to_string();

    let output = Command::new("yt-dlp")
        .args([
            "--no-playlist",
            "--write-auto-sub",
            "--write-sub",
            "--sub-lang",
            SUBTITLE_LANGS,
            "--skip-download",
            "--sub-format",
            "vtt",
            "--output",
            template.as_str(),
            url,
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::download_failed(
            classify_ytdlp_output(&stderr),
            format!("yt-dlp failed to download subtitles: {}", stderr.trim()),
        ));
    }

    find_downloaded(output_dir, SUBTITLE_STEM, |ext| ext == "vtt").await
}

/// Find the first file in `dir` named `<stem>.*` whose extension passes `accept`.
///
/// English variants (`.en`) sort first.
async fn find_downloaded<F>(dir: &Path, stem: &str, accept: F) -> MediaResult<Option<PathBuf>>
where
    F: Fn(&str) -> bool,
{
    let prefix = format!("{}.", stem);
    let mut found = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();
        if name.starts_with(&prefix) && accept(&ext) {
            found.push((name, path));
        }
    }
    found.sort_by_key(|(name, _)| (!name.contains(".en"), name.clone()));
    Ok(found.into_iter().next().map(|(_, path)| path))
}

/// Classify yt-dlp diagnostics into a download failure kind.
pub fn classify_ytdlp_output(output: &str) -> DownloadFailureKind {
    let lower = output.to_lowercase();

    if lower.contains("larger than max-filesize") || lower.contains("file is larger than") {
        DownloadFailureKind::TooLarge
    } else if lower.contains("sign in to confirm")
        || lower.contains("private video")
        || lower.contains("members-only")
        || lower.contains("http error 401")
        || lower.contains("http error 403")
        || lower.contains("login required")
    {
        DownloadFailureKind::Unauthorized
    } else if lower.contains("http error 404")
        || lower.contains("video unavailable")
        || lower.contains("unsupported url")
        || lower.contains("does not exist")
        || lower.contains("has been removed")
    {
        DownloadFailureKind::NotFound
    } else if lower.contains("timed out")
        || lower.contains("connection reset")
        || lower.contains("temporary failure in name resolution")
        || lower.contains("unable to download webpage")
        || lower.contains("http error 5")
        || lower.contains("http error 429")
    {
        DownloadFailureKind::Network
    } else {
        DownloadFailureKind::Other
    }
}
