//! Worker error types.

use thiserror::Error;
use vshort_analysis::AnalysisError;
use vshort_media::MediaError;
use vshort_messenger::MessengerError;
use vshort_store::StoreError;

use crate::fetch::FetchError;
use crate::payload::PayloadError;
use crate::validator::ValidationError;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Run-level errors. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Unusable analysis payload: {0}")]
    Payload(#[from] PayloadError),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("None of the {attempted} clips could be delivered")]
    NothingDelivered { attempted: usize },

    #[error("Clip processing aborted: {0}")]
    Aborted(#[from] SegmentError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Messenger error: {0}")]
    Messenger(#[from] MessengerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Short text for the failure notification.
    pub fn user_message(&self) -> String {
        match self {
            WorkerError::Fetch(e) => match e.kind {
                crate::fetch::FetchErrorKind::TooLarge => "the video is too large".to_string(),
                crate::fetch::FetchErrorKind::Unauthorized => {
                    "the video is private or restricted".to_string()
                }
                crate::fetch::FetchErrorKind::NotFound => "the video could not be found".to_string(),
                crate::fetch::FetchErrorKind::Network => {
                    "a network error occurred while downloading".to_string()
                }
                _ => "the video could not be downloaded or read".to_string(),
            },
            WorkerError::Analysis(AnalysisError::PollTimeout { .. }) => {
                "video analysis timed out".to_string()
            }
            WorkerError::Analysis(_) | WorkerError::Payload(_) => {
                "video analysis returned no usable result".to_string()
            }
            WorkerError::Validation(_) => "no suitable segments were found".to_string(),
            WorkerError::NothingDelivered { .. } => "none of the shorts could be delivered".to_string(),
            WorkerError::Aborted(_) => "the video encoder failed".to_string(),
            _ => "an internal error occurred".to_string(),
        }
    }

    /// Metric / log label.
    pub fn stage(&self) -> &'static str {
        match self {
            WorkerError::ConfigError(_) => "config",
            WorkerError::Fetch(_) => "fetch",
            WorkerError::Analysis(_) | WorkerError::Payload(_) => "analysis",
            WorkerError::Validation(_) => "selection",
            WorkerError::NothingDelivered { .. } => "deliver",
            WorkerError::Aborted(_) | WorkerError::Media(_) => "render",
            WorkerError::Store(_) => "store",
            WorkerError::Messenger(_) => "messenger",
            WorkerError::Io(_) => "io",
        }
    }
}

/// Failure of a single segment. Recorded in the batch, never propagated
/// unless fatal.
#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("Render failed: {0}")]
    Render(#[source] MediaError),

    #[error("Delivery failed: {0}")]
    Delivery(#[source] MessengerError),
}

impl SegmentError {
    /// Failures every remaining segment would hit identically.
    pub fn is_fatal(&self) -> bool {
        match self {
            SegmentError::Render(e) => e.is_fatal(),
            SegmentError::Delivery(_) => false,
        }
    }

    /// Diagnostic kept in the delivery result.
    pub fn short_detail(&self) -> String {
        match self {
            SegmentError::Render(e) => format!("render: {}", e.short_detail()),
            SegmentError::Delivery(e) => format!("delivery: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchErrorKind;

    #[test]
    fn test_segment_error_fatality() {
        assert!(SegmentError::Render(MediaError::EncoderUnavailable("libx264".into())).is_fatal());
        assert!(!SegmentError::Render(MediaError::DegenerateFrame { width: 0, height: 0 }).is_fatal());
        assert!(!SegmentError::Delivery(MessengerError::config("x")).is_fatal());
    }

    #[test]
    fn test_short_detail_prefix() {
        let err = SegmentError::Delivery(MessengerError::api("sendVideo", 413, "Request Entity Too Large"));
        assert!(err.short_detail().starts_with("delivery: "));
    }

    #[test]
    fn test_user_messages() {
        let err = WorkerError::Fetch(FetchError::new(FetchErrorKind::TooLarge, "2 GB"));
        assert_eq!(err.user_message(), "the video is too large");
        assert_eq!(err.stage(), "fetch");
        assert_eq!(WorkerError::NothingDelivered { attempted: 2 }.stage(), "deliver");
    }
}
