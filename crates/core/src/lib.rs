//! # Rekey Core
//!
//! Identifier types shared by every rekey crate.
//!
//! Both identifiers are opaque strings assigned by the remote automation
//! platform. They are validated on construction (non-empty, bounded length)
//! but otherwise never interpreted: comparison is exact and case-sensitive.
//!
//! ```rust
//! use rekey_core::{CredentialId, WorkflowId};
//!
//! let credential = CredentialId::new("R2d9xk1TqZ").unwrap();
//! let workflow = WorkflowId::new("wf-42").unwrap();
//! assert_eq!(credential.as_str(), "R2d9xk1TqZ");
//! assert_eq!(workflow.to_string(), "wf-42");
//! ```

pub mod error;
pub mod id;

pub use error::CoreError;
pub use id::{CredentialId, MAX_ID_LENGTH, WorkflowId};

/// Result type used by the core crate
pub type CoreResult<T> = Result<T, CoreError>;
