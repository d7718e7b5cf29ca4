//! Messenger error types.

use thiserror::Error;

pub type MessengerResult<T> = Result<T, MessengerError>;

#[derive(Debug, Error)]
pub enum MessengerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Telegram {method} failed ({code}): {description}")]
    Api {
        method: &'static str,
        code: i64,
        description: String,
    },

    #[error("File too large: {size} bytes (limit {limit})")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MessengerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn api(method: &'static str, code: i64, description: impl Into<String>) -> Self {
        Self::Api {
            method,
            code,
            description: description.into(),
        }
    }

    /// Telegram rejected access to the resource (bad token, bot removed from chat).
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, MessengerError::Api { code: 401 | 403, .. })
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            MessengerError::Api { code, description, .. } => {
                *code == 404 || description.to_lowercase().contains("not found")
            }
            _ => false,
        }
    }

    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            MessengerError::Network(e) => e.is_timeout() || e.is_connect(),
            MessengerError::Api { code, .. } => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(MessengerError::api("getFile", 401, "Unauthorized").is_unauthorized());
        assert!(MessengerError::api("getFile", 400, "Bad Request: file not found").is_not_found());
        assert!(MessengerError::api("sendVideo", 429, "Too Many Requests").is_retryable());
        assert!(!MessengerError::api("sendVideo", 400, "Bad Request").is_retryable());
        assert!(!MessengerError::FileTooLarge { size: 2, limit: 1 }.is_retryable());
    }
}
