//! Error types for onboard-rs

use thiserror::Error;

/// Result type alias for onboarding operations
pub type Result<T> = std::result::Result<T, OnboardError>;

/// Onboarding error types
#[derive(Error, Debug)]
pub enum OnboardError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-level HTTP error (connection refused, timeout, ...)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Backend answered with a non-success status
    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// Request superseded by a newer one
    #[error("Request cancelled")]
    Cancelled,

    /// Local validation failure
    #[error("Validation error: {0}")]
    Validation(String),

    /// Photo rejected by the picker
    #[error("Photo rejected: {0}")]
    Photo(String),

    /// Draft storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OnboardError {
    /// Cancellation is a normal outcome for superseded searches, not a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, OnboardError::Cancelled)
    }
}

impl From<reqwest::Error> for OnboardError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            OnboardError::Status {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            OnboardError::Http(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_is_distinguished() {
        assert!(OnboardError::Cancelled.is_cancelled());
        assert!(!OnboardError::Http("refused".to_string()).is_cancelled());
    }

    #[test]
    fn test_status_display() {
        let err = OnboardError::Status {
            status: 503,
            body: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "Request failed with status 503: unavailable");
    }
}
