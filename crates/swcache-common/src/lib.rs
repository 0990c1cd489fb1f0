//! # swcache common
//!
//! Logging configuration shared by the offline cache worker crates, the
//! smoke harness and the integration tests.

use thiserror::Error;

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat};

/// Errors raised while setting up shared infrastructure.
#[derive(Error, Debug)]
pub enum LoggingError {
    /// The filter directive string could not be parsed.
    #[error("Invalid log filter `{filter}`: {message}")]
    InvalidFilter { filter: String, message: String },

    /// A global subscriber is already installed.
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}
