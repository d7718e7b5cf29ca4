//! Source video models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Reference to a long-form source video, as handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceRef {
    /// Remote URL (YouTube, Vimeo, direct file link...).
    Url { url: String },
    /// Platform attachment (a Telegram file).
    Attachment {
        file_id: String,
        unique_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_size: Option<u64>,
    },
}

/// Error parsing a source reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceRefError {
    #[error("Source reference is empty")]
    Empty,

    #[error("Invalid source URL '{0}'")]
    InvalidUrl(String),

    #[error("Unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),
}

impl SourceRef {
    /// Parse and validate a URL source reference.
    pub fn url(raw: &str) -> Result<Self, SourceRefError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(SourceRefError::Empty);
        }
        let parsed = url::Url::parse(raw).map_err(|_| SourceRefError::InvalidUrl(raw.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => Ok(Self::Url {
                url: raw.to_string(),
            }),
            other => Err(SourceRefError::UnsupportedScheme(other.to_string())),
        }
    }

    /// Create an attachment reference.
    pub fn attachment(
        file_id: impl Into<String>,
        unique_id: impl Into<String>,
        file_size: Option<u64>,
    ) -> Self {
        Self::Attachment {
            file_id: file_id.into(),
            unique_id: unique_id.into(),
            file_size,
        }
    }

    /// Stable key used to dedup runs against the same source.
    ///
    /// Attachments are keyed by the platform's unique id, which stays the same
    /// when the same file is re-sent.
    pub fn source_key(&self) -> String {
        match self {
            Self::Url { url } => format!("url:{}", url.trim()),
            Self::Attachment { unique_id, .. } => format!("tg:{}", unique_id),
        }
    }

    /// Check whether this is a remote URL.
    pub fn is_url(&self) -> bool {
        matches!(self, Self::Url { .. })
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url { url } => write!(f, "{}", url),
            Self::Attachment { file_id, .. } => write!(f, "attachment:{}", file_id),
        }
    }
}

/// A fetched, probed source video.
///
/// Read-only once created; the file lives in the run's scratch directory and
/// disappears with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceVideo {
    /// Dedup identifier (see [`SourceRef::source_key`]).
    pub id: String,
    /// Local file path
    pub path: PathBuf,
    /// Total duration in seconds
    pub duration: f64,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
}

impl SourceVideo {
    pub fn new(
        id: impl Into<String>,
        path: impl Into<PathBuf>,
        duration: f64,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            duration,
            width,
            height,
        }
    }

    /// Shorter of the two frame dimensions.
    pub fn shorter_side(&self) -> u32 {
        self.width.min(self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_source_ref() {
        let source = SourceRef::url("  https://youtu.be/abc123def45 ").unwrap();
        assert_eq!(source.source_key(), "url:https://youtu.be/abc123def45");
        assert!(source.is_url());
    }

    #[test]
    fn test_url_source_ref_errors() {
        assert_eq!(SourceRef::url(""), Err(SourceRefError::Empty));
        assert!(matches!(
            SourceRef::url("not a url"),
            Err(SourceRefError::InvalidUrl(_))
        ));
        assert!(matches!(
            SourceRef::url("ftp://example.com/video.mp4"),
            Err(SourceRefError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_attachment_key_uses_unique_id() {
        let a = SourceRef::attachment("file-1", "uniq", Some(1024));
        let b = SourceRef::attachment("file-2", "uniq", None);
        assert_eq!(a.source_key(), b.source_key());
    }

    #[test]
    fn test_source_ref_serde_tagged() {
        let source = SourceRef::url("https://example.com/v.mp4").unwrap();
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["kind"], "url");
    }
}
