//! Rekey Credential - credential rotation for workflow automation platforms
//!
//! The platform cannot update a credential in place or read one back, so
//! rotating a secret means creating a replacement, repointing every workflow
//! that references the old credential, and only then deleting it. If a step
//! fails partway, already-applied changes are compensated.
//!
//! # Features
//!
//! - **Gateway traits** - [`CredentialGateway`] and [`WorkflowGateway`] hide
//!   transport; bring your own HTTP client
//! - **Rotation saga** - [`CredentialRotator`] with best-effort rollback and a
//!   structured [`RollbackReport`]
//! - **Throttling and cancellation** - fixed delay between workflow updates,
//!   cancellation checked before every workflow
//! - **Schema coercion** - string inputs converted to numbers and booleans
//!   from the credential-type schema
//! - **Test gateways** - in-memory fakes behind the `test-util` feature
#![forbid(unsafe_code)]

/// Platform capabilities consumed by the saga
pub mod gateway;
/// Credential rotation saga
pub mod rotation;
/// Schema-driven credential data coercion
pub mod schema;
/// In-memory gateways for tests
#[cfg(feature = "test-util")]
pub mod testing;

// ── Root re-exports ─────────────────────────────────────────────────────────

pub use crate::gateway::{
    CreatedCredential, CredentialGateway, GatewayError, GatewayResult, NewCredential,
    WorkflowGateway,
};
pub use crate::rotation::{
    CredentialRotator, RollbackReport, RotationError, RotationOutcome, RotationPolicy,
    RotationRequest, RotationResult,
};
pub use rekey_core::{CredentialId, WorkflowId};

/// Commonly used types and traits
pub mod prelude {
    pub use crate::gateway::{
        CreatedCredential, CredentialGateway, GatewayError, GatewayResult, NewCredential,
        WorkflowGateway,
    };
    pub use crate::rotation::{
        CredentialRotator, RollbackReport, RotationError, RotationOutcome, RotationPolicy,
        RotationRequest, RotationResult, StepOutcome,
    };
    pub use rekey_core::{CredentialId, WorkflowId};
    pub use rekey_workflow::{CredentialReference, NodeDefinition, WorkflowDefinition};
    pub use tokio_util::sync::CancellationToken;
}
