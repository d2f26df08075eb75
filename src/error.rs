//! Error types for the submission client.

use thiserror::Error;

/// Main error type for client setup and configuration.
///
/// Per-submission conditions (rate limiting, transport failures) are not errors;
/// they are reported through [`crate::submission::Outcome`].
#[derive(Error, Debug)]
pub enum CrptError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Body serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client construction errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<::config::ConfigError> for CrptError {
    fn from(err: ::config::ConfigError) -> Self {
        CrptError::Config(err.to_string())
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, CrptError>;
