use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CheckerError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("External process error: {0}")]
    Process(String),

    #[error("Media inspection failed: {0}")]
    Inspection(String),

    #[error("Subscription download failed: {0}")]
    Download(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Metrics error: {0}")]
    Metrics(String),
}

impl CheckerError {
    /// Transient failures worth another attempt at the subscription layer.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CheckerError::Network(_) | CheckerError::Timeout(_) | CheckerError::Download(_)
        )
    }
}

impl From<std::io::Error> for CheckerError {
    fn from(err: std::io::Error) -> Self {
        CheckerError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CheckerError {
    fn from(err: serde_json::Error) -> Self {
        CheckerError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for CheckerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            CheckerError::InvalidUrl(err.to_string())
        } else {
            CheckerError::Network(err.to_string())
        }
    }
}

impl From<url::ParseError> for CheckerError {
    fn from(err: url::ParseError) -> Self {
        CheckerError::InvalidUrl(err.to_string())
    }
}
