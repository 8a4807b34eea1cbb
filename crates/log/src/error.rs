//! Logger setup errors

use thiserror::Error;

/// Errors raised while installing the subscriber
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    /// The level directive could not be parsed.
    #[error("invalid log filter {0}")]
    Filter(String),

    /// A global subscriber was installed earlier in this process.
    #[error("a global subscriber is already installed")]
    AlreadyInitialized,
}

/// Result type for logger setup
pub type LogResult<T> = Result<T, LogError>;
