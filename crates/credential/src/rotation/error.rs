//! Rotation-specific error types
//!
//! Only failures that abort the saga are errors. Compensation failures are
//! never raised on their own: they are folded into the [`RollbackReport`]
//! attached to the terminal error, so the triggering cause is never masked.
//! A failed retirement of the old credential is not an error either; see
//! [`RotationOutcome::retirement`](super::RotationOutcome::retirement).

use rekey_core::{CredentialId, WorkflowId};
use thiserror::Error;

use crate::gateway::GatewayError;

use super::rollback::RollbackReport;
use super::state::RotationState;

/// Errors that terminate a credential rotation
#[derive(Debug, Error)]
pub enum RotationError {
    /// Policy validation failed; nothing was attempted.
    #[error("invalid rotation policy: {reason}")]
    InvalidPolicy { reason: String },

    /// Internal state machine misuse.
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        from: RotationState,
        to: RotationState,
    },

    /// The replacement credential could not be created. Nothing external
    /// changed, so no compensation ran.
    #[error("rotation failed: could not create replacement credential: {source}")]
    CreateFailed { source: GatewayError },

    /// Listing workflows failed after the replacement credential existed.
    #[error("rotation failed: could not list workflows: {source}; {rollback}")]
    ScanFailed {
        source: GatewayError,
        rollback: RollbackReport,
    },

    /// More workflows reference the credential than the policy allows.
    #[error(
        "rotation failed: credential {credential_id} is referenced by {found} workflows, \
         limit is {limit}; {rollback}"
    )]
    TooManyWorkflows {
        credential_id: CredentialId,
        found: usize,
        limit: usize,
        rollback: RollbackReport,
    },

    /// Reading a workflow's current definition failed mid-rotation.
    #[error("rotation failed: could not read workflow {workflow_id}: {source}; {rollback}")]
    PatchFetchFailed {
        workflow_id: WorkflowId,
        source: GatewayError,
        rollback: RollbackReport,
    },

    /// Pushing a patched workflow definition failed mid-rotation.
    #[error("rotation failed: could not update workflow {workflow_id}: {source}; {rollback}")]
    PatchApplyFailed {
        workflow_id: WorkflowId,
        source: GatewayError,
        rollback: RollbackReport,
    },

    /// The caller cancelled the rotation. When the replacement credential
    /// already existed, the rollback report says how it was cleaned up.
    #[error("rotation cancelled{}", describe_rollback(.rollback.as_ref()))]
    Cancelled { rollback: Option<RollbackReport> },
}

fn describe_rollback(rollback: Option<&RollbackReport>) -> String {
    rollback.map(|r| format!("; {r}")).unwrap_or_default()
}

impl RotationError {
    /// The compensation report, when compensation ran.
    pub fn rollback(&self) -> Option<&RollbackReport> {
        match self {
            Self::ScanFailed { rollback, .. }
            | Self::TooManyWorkflows { rollback, .. }
            | Self::PatchFetchFailed { rollback, .. }
            | Self::PatchApplyFailed { rollback, .. } => Some(rollback),
            Self::Cancelled { rollback } => rollback.as_ref(),
            Self::InvalidPolicy { .. }
            | Self::InvalidStateTransition { .. }
            | Self::CreateFailed { .. } => None,
        }
    }

    /// Whether anything needs manual attention after this failure: an
    /// orphaned replacement credential or workflows left patched.
    pub fn needs_manual_intervention(&self) -> bool {
        self.rollback().is_some_and(|r| !r.is_clean())
    }
}

/// Result type for rotation operations
pub type RotationResult<T> = Result<T, RotationError>;
