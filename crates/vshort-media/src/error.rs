//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("yt-dlp not found in PATH")]
    YtDlpNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Encoder unavailable: {0}")]
    EncoderUnavailable(String),

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Download failed ({kind}): {message}")]
    DownloadFailed {
        kind: DownloadFailureKind,
        message: String,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Degenerate frame size {width}x{height}")]
    DegenerateFrame { width: u32, height: u32 },

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a download failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadFailureKind {
    TooLarge,
    Unauthorized,
    NotFound,
    Network,
    Other,
}

impl DownloadFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadFailureKind::TooLarge => "too_large",
            DownloadFailureKind::Unauthorized => "unauthorized",
            DownloadFailureKind::NotFound => "not_found",
            DownloadFailureKind::Network => "network_error",
            DownloadFailureKind::Other => "other",
        }
    }
}

impl std::fmt::Display for DownloadFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stderr markers that mean the encoder itself cannot be used.
const ENCODER_FAILURE_MARKERS: &[&str] = &[
    "Unknown encoder",
    "Encoder not found",
    "Error initializing output stream",
    "Error while opening encoder",
];

impl MediaError {
    /// Create an FFmpeg failure error.
    ///
    /// Encoder initialization failures found in `stderr` are promoted to
    /// [`MediaError::EncoderUnavailable`].
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        if let Some(line) = stderr.as_deref().and_then(find_encoder_failure) {
            return Self::EncoderUnavailable(line.to_string());
        }
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a download failure error.
    pub fn download_failed(kind: DownloadFailureKind, message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            kind,
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Fatal errors affect every clip of a run, not just the current one.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MediaError::FfmpegNotFound | MediaError::FfprobeNotFound | MediaError::EncoderUnavailable(_)
        )
    }

    /// Short diagnostic suitable for a delivery result.
    pub fn short_detail(&self) -> String {
        match self {
            MediaError::FfmpegFailed {
                message, stderr, ..
            } => match stderr.as_deref().and_then(|s| s.lines().rev().find(|l| !l.trim().is_empty())) {
                Some(last) => format!("{}: {}", message, last.trim()),
                None => message.clone(),
            },
            other => other.to_string(),
        }
    }
}

fn find_encoder_failure(stderr: &str) -> Option<&str> {
    stderr
        .lines()
        .find(|line| ENCODER_FAILURE_MARKERS.iter().any(|m| line.contains(m)))
        .map(str::trim)
}
