//! Error types for cache worker operations.

use thiserror::Error;

/// Errors that can occur in cache worker operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SwError {
    /// The request never produced a response (offline, DNS, reset).
    #[error("Network error: {0}")]
    Network(String),

    /// A response arrived but its status is not usable here.
    #[error("Bad response status {status} for {url}")]
    BadStatus { url: String, status: u16 },

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Lifecycle transition attempted from the wrong state.
    #[error("State error: {0}")]
    State(String),

    #[error("Install failed: {0}")]
    InstallFailed(String),
}

impl SwError {
    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Create a cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache(message.into())
    }

    /// Get the error category for stats and log fields.
    pub fn category(&self) -> &'static str {
        match self {
            SwError::Network(_) => "network",
            SwError::BadStatus { .. } => "bad_status",
            SwError::Cache(_) => "cache",
            SwError::InvalidUrl(_) => "invalid_url",
            SwError::State(_) => "state",
            SwError::InstallFailed(_) => "install_failed",
        }
    }
}

impl From<url::ParseError> for SwError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

/// Result type alias for cache worker operations.
pub type SwResult<T> = Result<T, SwError>;
