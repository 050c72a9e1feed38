//! Error types for the concierge pipeline.
//!
//! This module defines a unified error enum that covers all error categories
//! in the application, including query validation, configuration, I/O,
//! upstream LLM failures, prompt rendering, and corpus consistency.

use thiserror::Error;

/// Unified error type for the concierge pipeline.
///
/// All functions in the application return `Result<T, AppError>`.
/// We never panic — errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Empty or malformed query, recovered locally with a user-facing message
    #[error("Invalid query: {0}")]
    Validation(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The LLM call failed, timed out, or returned malformed output.
    /// Surfaced to the caller as a retryable failure.
    #[error("Upstream service error: {0}")]
    Upstream(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Corpus feed and snapshot errors
    #[error("Corpus error: {0}")]
    Corpus(String),

    /// A name match or retrieved candidate references a record that does
    /// not exist in the snapshot. Fatal for the request.
    #[error("Internal consistency error: {0}")]
    Consistency(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether the caller may retry the request as-is.
    ///
    /// Only upstream LLM failures are retryable; everything else is either
    /// a caller mistake or a fault that a retry would reproduce.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Upstream(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_upstream_is_retryable() {
        assert!(AppError::Upstream("timeout".to_string()).is_retryable());
        assert!(!AppError::Validation("empty".to_string()).is_retryable());
        assert!(!AppError::Consistency("orphan".to_string()).is_retryable());
        assert!(!AppError::Config("bad".to_string()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = AppError::Validation("query must not be empty".to_string());
        assert_eq!(err.to_string(), "Invalid query: query must not be empty");

        let err = AppError::Upstream("LLM timed out".to_string());
        assert!(err.to_string().starts_with("Upstream service error"));
    }
}
