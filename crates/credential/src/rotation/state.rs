//! Rotation State Machine
//!
//! Tracks where a rotation saga is.

use serde::{Deserialize, Serialize};

use super::error::{RotationError, RotationResult};

/// State of a rotation saga
///
/// # State Transitions
///
/// ```text
/// Idle → CreatingCredential → ScanningWorkflows → UpdatingWorkflows → RetiringOldCredential → Completed
///  ↓            ↓                     ↓                   ↓
///  → → → → → Failed ← ← RollingBack ← ← ← ← ← ← ← ← ← ← ←
/// ```
///
/// Creation failures go straight to `Failed`: nothing exists yet that
/// would need compensating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationState {
    /// Not started
    Idle,

    /// Creating the replacement credential
    CreatingCredential,

    /// Listing workflows and capturing backups
    ScanningWorkflows,

    /// Repointing affected workflows one by one
    UpdatingWorkflows,

    /// Deleting the old credential
    RetiringOldCredential,

    /// Rotation finished successfully
    Completed,

    /// Compensating a failure
    RollingBack,

    /// Rotation aborted
    Failed,
}

impl RotationState {
    /// Check if transition to the target state is valid
    #[must_use]
    pub fn can_transition_to(&self, target: RotationState) -> bool {
        use RotationState::*;

        matches!(
            (self, target),
            // Forward progress
            (Idle, CreatingCredential)
                | (CreatingCredential, ScanningWorkflows)
                | (ScanningWorkflows, UpdatingWorkflows)
                | (UpdatingWorkflows, RetiringOldCredential)
                | (RetiringOldCredential, Completed)
                // Nothing to compensate yet
                | (Idle | CreatingCredential, Failed)
                // Compensation once the replacement credential exists
                | (ScanningWorkflows | UpdatingWorkflows, RollingBack)
                | (RollingBack, Failed)
        )
    }

    /// Validate and perform state transition
    pub fn transition_to(&self, target: RotationState) -> RotationResult<RotationState> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(RotationError::InvalidStateTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Check if state is terminal (no more transitions possible)
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, RotationState::Completed | RotationState::Failed)
    }
}

impl std::fmt::Display for RotationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RotationState::Idle => "idle",
            RotationState::CreatingCredential => "creating_credential",
            RotationState::ScanningWorkflows => "scanning_workflows",
            RotationState::UpdatingWorkflows => "updating_workflows",
            RotationState::RetiringOldCredential => "retiring_old_credential",
            RotationState::Completed => "completed",
            RotationState::RollingBack => "rolling_back",
            RotationState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RotationState::*;

    #[test]
    fn test_valid_forward_transitions() {
        assert!(Idle.can_transition_to(CreatingCredential));
        assert!(CreatingCredential.can_transition_to(ScanningWorkflows));
        assert!(ScanningWorkflows.can_transition_to(UpdatingWorkflows));
        assert!(UpdatingWorkflows.can_transition_to(RetiringOldCredential));
        assert!(RetiringOldCredential.can_transition_to(Completed));
    }

    #[test]
    fn test_compensation_paths() {
        assert!(CreatingCredential.can_transition_to(Failed));
        assert!(!CreatingCredential.can_transition_to(RollingBack));

        assert!(ScanningWorkflows.can_transition_to(RollingBack));
        assert!(UpdatingWorkflows.can_transition_to(RollingBack));
        assert!(RollingBack.can_transition_to(Failed));

        // Retirement failure is not a rollback trigger
        assert!(!RetiringOldCredential.can_transition_to(RollingBack));
        assert!(!RetiringOldCredential.can_transition_to(Failed));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!Idle.can_transition_to(ScanningWorkflows));
        assert!(!ScanningWorkflows.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Idle));
        assert!(!Failed.can_transition_to(RollingBack));
        assert!(!RollingBack.can_transition_to(Completed));
    }

    #[test]
    fn test_terminal_states() {
        for state in [
            Idle,
            CreatingCredential,
            ScanningWorkflows,
            UpdatingWorkflows,
            RetiringOldCredential,
            RollingBack,
        ] {
            assert!(!state.is_terminal(), "{state}");
        }
        assert!(Completed.is_terminal());
        assert!(Failed.is_terminal());
    }

    #[test]
    fn test_transition_validation() {
        assert_eq!(Idle.transition_to(CreatingCredential).unwrap(), CreatingCredential);

        let err = Idle.transition_to(Completed).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid state transition from idle to completed"
        );
    }
}
