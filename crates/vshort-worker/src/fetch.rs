//! Source fetching: URL downloads and Telegram attachments.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};
use vshort_media::{download_subtitles, download_video, probe_source, DownloadFailureKind, MediaError};
use vshort_messenger::{MessengerError, TelegramClient, BOT_DOWNLOAD_LIMIT};
use vshort_models::{SourceRef, SourceVideo, TranscriptCue};

use crate::transcript::load_vtt;

/// Why a source could not be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    TooLarge,
    Unauthorized,
    NotFound,
    Network,
    /// Downloaded but unreadable as a video
    InvalidMedia,
    /// Source kind not supported by this fetcher
    Unsupported,
    Other,
}

impl FetchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchErrorKind::TooLarge => "too_large",
            FetchErrorKind::Unauthorized => "unauthorized",
            FetchErrorKind::NotFound => "not_found",
            FetchErrorKind::Network => "network_error",
            FetchErrorKind::InvalidMedia => "invalid_media",
            FetchErrorKind::Unsupported => "unsupported",
            FetchErrorKind::Other => "other",
        }
    }
}

impl std::fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<DownloadFailureKind> for FetchErrorKind {
    fn from(kind: DownloadFailureKind) -> Self {
        match kind {
            DownloadFailureKind::TooLarge => FetchErrorKind::TooLarge,
            DownloadFailureKind::Unauthorized => FetchErrorKind::Unauthorized,
            DownloadFailureKind::NotFound => FetchErrorKind::NotFound,
            DownloadFailureKind::Network => FetchErrorKind::Network,
            DownloadFailureKind::Other => FetchErrorKind::Other,
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<MediaError> for FetchError {
    fn from(err: MediaError) -> Self {
        let kind = match &err {
            MediaError::DownloadFailed { kind, .. } => (*kind).into(),
            MediaError::FfprobeFailed { .. }
            | MediaError::InvalidVideo(_)
            | MediaError::JsonParse(_) => FetchErrorKind::InvalidMedia,
            _ => FetchErrorKind::Other,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<MessengerError> for FetchError {
    fn from(err: MessengerError) -> Self {
        let kind = if matches!(err, MessengerError::FileTooLarge { .. }) {
            FetchErrorKind::TooLarge
        } else if err.is_unauthorized() {
            FetchErrorKind::Unauthorized
        } else if err.is_not_found() {
            FetchErrorKind::NotFound
        } else if matches!(err, MessengerError::Network(_)) || err.is_retryable() {
            FetchErrorKind::Network
        } else {
            FetchErrorKind::Other
        };
        Self::new(kind, err.to_string())
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        Self::new(FetchErrorKind::Other, err.to_string())
    }
}

/// A probed source plus whatever transcript came with it.
#[derive(Debug, Clone)]
pub struct FetchedSource {
    pub video: SourceVideo,
    /// Empty when no subtitles were available
    pub transcript: Vec<TranscriptCue>,
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `source` into `work_dir` (the run's scratch directory).
    async fn fetch(&self, source: &SourceRef, work_dir: &Path) -> Result<FetchedSource, FetchError>;
}

/// yt-dlp for URLs, Bot API downloads for attachments, ffprobe for both.
pub struct SourceFetcher {
    telegram: Option<Arc<TelegramClient>>,
    max_bytes: u64,
    fetch_subtitles: bool,
}

impl SourceFetcher {
    pub fn new(telegram: Option<Arc<TelegramClient>>, max_bytes: u64) -> Self {
        Self {
            telegram,
            max_bytes,
            fetch_subtitles: true,
        }
    }

    pub fn with_subtitles(mut self, enabled: bool) -> Self {
        self.fetch_subtitles = enabled;
        self
    }

    async fn fetch_url(&self, source_id: &str, url: &str, work_dir: &Path) -> Result<FetchedSource, FetchError> {
        let path = download_video(url, work_dir, self.max_bytes).await?;
        let video = probe_source(source_id, &path).await?;

        let transcript = if self.fetch_subtitles {
            match download_subtitles(url, work_dir).await {
                Ok(Some(subs)) => load_vtt(&subs).await.unwrap_or_else(|e| {
                    warn!(error = %e, "Failed to read subtitles");
                    Vec::new()
                }),
                Ok(None) => Vec::new(),
                Err(e) => {
                    warn!(error = %e, "Subtitle download failed, continuing without transcript");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        Ok(FetchedSource { video, transcript })
    }

    async fn fetch_attachment(
        &self,
        source_id: &str,
        file_id: &str,
        declared_size: Option<u64>,
        work_dir: &Path,
    ) -> Result<FetchedSource, FetchError> {
        let client = self.telegram.as_ref().ok_or_else(|| {
            FetchError::new(FetchErrorKind::Unsupported, "attachments need a Telegram client")
        })?;
        let limit = self.max_bytes.min(BOT_DOWNLOAD_LIMIT);

        if let Some(size) = declared_size.filter(|s| *s > limit) {
            return Err(FetchError::new(
                FetchErrorKind::TooLarge,
                format!("attachment is {size} bytes, limit is {limit}"),
            ));
        }

        let file = client.get_file(file_id).await?;
        if file.file_path.is_none() || file.file_size.map(|s| s > limit).unwrap_or(false) {
            return Err(FetchError::new(
                FetchErrorKind::TooLarge,
                "attachment exceeds the bot download limit",
            ));
        }

        let path = work_dir.join("source.mp4");
        client.download_file(&file, &path, limit).await?;
        let video = probe_source(source_id, &path).await?;

        Ok(FetchedSource {
            video,
            transcript: Vec::new(),
        })
    }
}

#[async_trait]
impl Fetcher for SourceFetcher {
    async fn fetch(&self, source: &SourceRef, work_dir: &Path) -> Result<FetchedSource, FetchError> {
        let source_id = source.source_key();
        let fetched = match source {
            SourceRef::Url { url } => self.fetch_url(&source_id, url, work_dir).await?,
            SourceRef::Attachment {
                file_id, file_size, ..
            } => {
                self.fetch_attachment(&source_id, file_id, *file_size, work_dir)
                    .await?
            }
        };

        info!(
            source = %source_id,
            duration = fetched.video.duration,
            width = fetched.video.width,
            height = fetched.video.height,
            cues = fetched.transcript.len(),
            "Fetched source"
        );
        Ok(fetched)
    }
}
