//! Error types for the Ragline pipeline.
//!
//! This module defines a unified error enum covering every failure category
//! in the system: request validation, retrieval back-ends, language models,
//! prompt rendering, and configuration.

use thiserror::Error;

/// Unified error type for the Ragline pipeline.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
/// We never panic — errors must be represented and propagated.
///
/// Errors are scoped to one request: nothing here is fatal to the process,
/// and a failure in one request's fan-out or generation cannot affect other
/// in-flight requests.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed chat request (e.g., an unparseable history turn).
    /// Rejected before any external call and never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A single retrieval back-end call failed. Recovered locally as an
    /// empty contribution unless every back-end fails.
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// All configured retrieval back-ends failed; continuing would
    /// synthesize an answer with zero grounding.
    #[error("All retrieval back-ends unavailable: {0}")]
    UpstreamUnavailable(String),

    /// A single language model call failed. Retryable via the fallback
    /// chain on the answer path.
    #[error("Model error: {0}")]
    Model(String),

    /// The model fallback chain is exhausted (or the condenser, which has
    /// no fallback, failed).
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
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
    fn test_error_display() {
        let err = AppError::Validation("chat_history[2] is not an object".to_string());
        assert!(err.to_string().contains("Validation error"));

        let err = AppError::UpstreamUnavailable("2 of 2 back-ends failed".to_string());
        assert!(err.to_string().contains("unavailable"));
    }

    #[test]
    fn test_from_serde_json() {
        let parse_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: AppError = parse_err.into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
