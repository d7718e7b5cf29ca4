//! Analysis client error types.

use thiserror::Error;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Gemini API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("File processing failed: {0}")]
    ProcessingFailed(String),

    #[error("File still processing after {attempts} polls ({waited_secs}s)")]
    PollTimeout { attempts: u32, waited_secs: u64 },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            AnalysisError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            AnalysisError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
