//! Core error types.

use thiserror::Error;

/// Errors raised while constructing core types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// An identifier was empty.
    #[error("{kind} id must not be empty")]
    EmptyId {
        /// Which identifier was being built (`credential`, `workflow`).
        kind: &'static str,
    },

    /// An identifier exceeded [`MAX_ID_LENGTH`](crate::MAX_ID_LENGTH).
    #[error("{kind} id exceeds maximum length of {max} characters (got {len})")]
    IdTooLong {
        /// Which identifier was being built.
        kind: &'static str,
        /// Actual length in bytes.
        len: usize,
        /// Configured maximum.
        max: usize,
    },
}
