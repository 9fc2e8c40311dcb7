//! Error types for chathub.

use thiserror::Error;

/// Common error type for chathub.
#[derive(Error, Debug)]
pub enum ChatHubError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration values are out of range.
    #[error("validation error: {0}")]
    Validation(String),

    /// The hub coordination loop is no longer running.
    ///
    /// Only happens after shutdown; submitting to a stopped hub is a
    /// programming error and is never retried.
    #[error("hub is not running")]
    HubClosed,
}

/// Result type alias for chathub operations.
pub type Result<T> = std::result::Result<T, ChatHubError>;
