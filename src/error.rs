//! Error types for httpspy

use std::io;
use thiserror::Error;

/// Result type for httpspy operations
pub type Result<T> = std::result::Result<T, SpyError>;

/// Errors that can occur in httpspy
#[derive(Debug, Error)]
pub enum SpyError {
    /// A singular accessor was used before any request was captured
    #[error("No captured request exists yet for route {route}")]
    NoMatch {
        /// Description of the route that was queried
        route: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Domain or path pattern failed to compile
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// Pattern as given by the caller
        pattern: String,
        /// Compiler message
        reason: String,
    },

    /// Route cannot be registered as configured
    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    /// Reply carries a header the engine cannot send
    #[error("Invalid reply: {0}")]
    InvalidReply(String),
}

impl SpyError {
    /// Check if this is the "nothing captured yet" error
    #[must_use]
    pub fn is_no_match(&self) -> bool {
        matches!(self, SpyError::NoMatch { .. })
    }
}
