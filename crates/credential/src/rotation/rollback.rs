//! Compensation for a failed rotation.
//!
//! Rollback is best-effort: every step runs regardless of earlier failures
//! and nothing is raised. Each step yields a [`StepOutcome`]; the
//! coordinator folds them into one [`RollbackReport`] and logs it once.

use std::fmt;

use rekey_core::{CredentialId, WorkflowId};

use crate::gateway::{CredentialGateway, WorkflowGateway};

use super::backup::RotationContext;

/// Result of a single best-effort step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step completed.
    Succeeded,
    /// The step failed; `reason` is meant for operators.
    Failed { reason: String },
}

impl StepOutcome {
    /// Build a failure from anything printable.
    pub fn failed(reason: impl fmt::Display) -> Self {
        Self::Failed {
            reason: reason.to_string(),
        }
    }

    /// Whether the step completed.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// The failure reason, if any.
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Succeeded => None,
            Self::Failed { reason } => Some(reason),
        }
    }
}

impl<E: fmt::Display> From<Result<(), E>> for StepOutcome {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::Succeeded,
            Err(error) => Self::failed(error),
        }
    }
}

/// Outcome of restoring one updated workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreOutcome {
    /// The workflow that was restored (or not).
    pub workflow_id: WorkflowId,
    /// What happened.
    pub outcome: StepOutcome,
}

impl RestoreOutcome {
    /// Pair a workflow with its restore outcome.
    pub fn new(workflow_id: WorkflowId, outcome: StepOutcome) -> Self {
        Self {
            workflow_id,
            outcome,
        }
    }
}

/// Everything compensation did, for the operator.
///
/// Answers three questions: did the rotation fail (implied by its presence),
/// was the replacement credential cleaned up, and how many already-updated
/// workflows were restored versus left pointing at the replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackReport {
    new_credential_id: CredentialId,
    credential_cleanup: StepOutcome,
    restores: Vec<RestoreOutcome>,
}

impl RollbackReport {
    /// Assemble a report.
    pub fn new(
        new_credential_id: CredentialId,
        credential_cleanup: StepOutcome,
        restores: Vec<RestoreOutcome>,
    ) -> Self {
        Self {
            new_credential_id,
            credential_cleanup,
            restores,
        }
    }

    /// The replacement credential compensation tried to delete.
    pub fn new_credential_id(&self) -> &CredentialId {
        &self.new_credential_id
    }

    /// Outcome of deleting the replacement credential.
    pub fn credential_cleanup(&self) -> &StepOutcome {
        &self.credential_cleanup
    }

    /// Per-workflow restore outcomes, in update order.
    pub fn restores(&self) -> &[RestoreOutcome] {
        &self.restores
    }

    /// Number of restores attempted (one per updated workflow).
    pub fn attempted(&self) -> usize {
        self.restores.len()
    }

    /// Number of workflows put back to their pre-rotation definition.
    pub fn restored(&self) -> usize {
        self.restores
            .iter()
            .filter(|r| r.outcome.is_success())
            .count()
    }

    /// Workflows that still reference the replacement credential.
    pub fn left_patched(&self) -> Vec<&WorkflowId> {
        self.restores
            .iter()
            .filter(|r| !r.outcome.is_success())
            .map(|r| &r.workflow_id)
            .collect()
    }

    /// The replacement credential, if it could not be deleted.
    pub fn orphaned_credential(&self) -> Option<&CredentialId> {
        (!self.credential_cleanup.is_success()).then_some(&self.new_credential_id)
    }

    /// Whether compensation fully undid the rotation.
    pub fn is_clean(&self) -> bool {
        self.credential_cleanup.is_success() && self.restored() == self.attempted()
    }

    fn log_summary(&self) {
        let left_patched: Vec<&str> = self.left_patched().iter().map(|id| id.as_str()).collect();

        if let Some(reason) = self.credential_cleanup.failure_reason() {
            tracing::error!(
                new_credential_id = %self.new_credential_id,
                reason,
                restored = self.restored(),
                attempted = self.attempted(),
                ?left_patched,
                "rollback could not delete the replacement credential, manual cleanup required"
            );
        } else if !left_patched.is_empty() {
            tracing::warn!(
                new_credential_id = %self.new_credential_id,
                restored = self.restored(),
                attempted = self.attempted(),
                ?left_patched,
                "rollback left workflows patched, manual intervention required"
            );
        } else {
            tracing::info!(
                new_credential_id = %self.new_credential_id,
                restored = self.restored(),
                attempted = self.attempted(),
                "rollback complete"
            );
        }
    }
}

impl fmt::Display for RollbackReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.credential_cleanup {
            StepOutcome::Succeeded => write!(f, "new credential {} deleted", self.new_credential_id)?,
            StepOutcome::Failed { reason } => write!(
                f,
                "new credential {} NOT deleted ({reason}), manual cleanup required",
                self.new_credential_id
            )?,
        }

        write!(
            f,
            "; restored {}/{} updated workflows",
            self.restored(),
            self.attempted()
        )?;

        let left_patched = self.left_patched();
        if !left_patched.is_empty() {
            let ids: Vec<&str> = left_patched.iter().map(|id| id.as_str()).collect();
            write!(f, ", left patched: {}", ids.join(", "))?;
        }
        Ok(())
    }
}

/// Undoes a partially applied rotation.
pub struct RollbackCoordinator<'a, C: ?Sized, W: ?Sized> {
    credentials: &'a C,
    workflows: &'a W,
}

impl<'a, C, W> RollbackCoordinator<'a, C, W>
where
    C: CredentialGateway + ?Sized,
    W: WorkflowGateway + ?Sized,
{
    /// Create a coordinator over the two gateways.
    pub fn new(credentials: &'a C, workflows: &'a W) -> Self {
        Self {
            credentials,
            workflows,
        }
    }

    /// Delete the replacement credential, then restore every workflow in
    /// `context.updated()` from its backup.
    ///
    /// Only workflows that were actually updated are restored; backed-up
    /// workflows the saga never reached are left alone. Never fails and is
    /// not cancellable.
    pub async fn rollback(&self, context: &RotationContext) -> RollbackReport {
        let new_credential_id = context.new_credential_id();
        tracing::warn!(
            new_credential_id = %new_credential_id,
            updated = context.updated().len(),
            "rolling back credential rotation"
        );

        let credential_cleanup = StepOutcome::from(self.credentials.delete(new_credential_id).await);
        match credential_cleanup.failure_reason() {
            None => tracing::debug!(%new_credential_id, "deleted replacement credential"),
            Some(reason) => tracing::debug!(%new_credential_id, reason, "failed to delete replacement credential"),
        }

        let mut restores = Vec::with_capacity(context.updated().len());
        for workflow_id in context.updated() {
            let outcome = match context.backup_for(workflow_id) {
                Some(backup) => StepOutcome::from(
                    self.workflows
                        .update(workflow_id, backup.snapshot())
                        .await,
                ),
                None => StepOutcome::failed("no backup captured"),
            };

            match outcome.failure_reason() {
                None => tracing::debug!(%workflow_id, "restored workflow"),
                Some(reason) => tracing::debug!(%workflow_id, reason, "failed to restore workflow"),
            }
            restores.push(RestoreOutcome::new(workflow_id.clone(), outcome));
        }

        let report = RollbackReport::new(new_credential_id.clone(), credential_cleanup, restores);
        report.log_summary();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayError;
    use crate::rotation::backup::WorkflowBackup;
    use crate::testing::{GatewayCall, InMemoryCredentials, InMemoryWorkflows, Operation};
    use pretty_assertions::assert_eq;
    use rekey_workflow::{CredentialReference, NodeDefinition, WorkflowDefinition};

    fn cred(raw: &str) -> CredentialId {
        CredentialId::new(raw).unwrap()
    }

    fn wf_id(raw: &str) -> WorkflowId {
        WorkflowId::new(raw).unwrap()
    }

    fn workflow(id: &str, credential: &str) -> WorkflowDefinition {
        WorkflowDefinition::new(format!("workflow {id}"))
            .with_id(wf_id(id))
            .with_node(NodeDefinition::new("Call API").with_credential(
                "httpHeaderAuth",
                CredentialReference::new(cred(credential), "API key"),
            ))
    }

    fn context_with(updated: &[&str], backed_up: &[&str]) -> RotationContext {
        let mut context = RotationContext::new(cred("cred-1"), cred("cred-2"));
        context.set_backups(
            backed_up
                .iter()
                .map(|id| WorkflowBackup::capture(wf_id(id), &workflow(id, "cred-1")))
                .collect(),
        );
        for id in updated {
            context.record_updated(wf_id(id));
        }
        context
    }

    #[tokio::test]
    async fn restores_only_updated_workflows() {
        let credentials = InMemoryCredentials::new().with_existing(cred("cred-2"), "new", "httpHeaderAuth");
        let workflows = InMemoryWorkflows::new()
            .with_workflow(workflow("wf-1", "cred-2"))
            .with_workflow(workflow("wf-2", "cred-1"));
        let context = context_with(&["wf-1"], &["wf-1", "wf-2"]);

        let report = RollbackCoordinator::new(&credentials, &workflows)
            .rollback(&context)
            .await;

        assert!(report.is_clean());
        assert_eq!(report.attempted(), 1);
        assert_eq!(workflows.updates(), vec![wf_id("wf-1")]);
        assert_eq!(workflows.stored(&wf_id("wf-1")), Some(workflow("wf-1", "cred-1")));
        assert!(!credentials.contains(&cred("cred-2")));
    }

    #[tokio::test]
    async fn continues_after_credential_delete_failure() {
        let credentials = InMemoryCredentials::new().with_existing(cred("cred-2"), "new", "httpHeaderAuth");
        credentials.fail(Operation::DeleteCredential, GatewayError::Transport("timeout".into()));
        let workflows = InMemoryWorkflows::new().with_workflow(workflow("wf-1", "cred-2"));
        let context = context_with(&["wf-1"], &["wf-1"]);

        let report = RollbackCoordinator::new(&credentials, &workflows)
            .rollback(&context)
            .await;

        assert_eq!(report.orphaned_credential(), Some(&cred("cred-2")));
        assert_eq!(report.restored(), 1);
        assert!(!report.is_clean());
        assert_eq!(
            report.to_string(),
            "new credential cred-2 NOT deleted (transport error: timeout), manual cleanup required; \
             restored 1/1 updated workflows"
        );
    }

    #[tokio::test]
    async fn tallies_failed_and_missing_restores() {
        let credentials = InMemoryCredentials::new().with_existing(cred("cred-2"), "new", "httpHeaderAuth");
        let workflows = InMemoryWorkflows::new()
            .with_workflow(workflow("wf-1", "cred-2"))
            .with_workflow(workflow("wf-2", "cred-2"));
        workflows.fail_for(
            Operation::UpdateWorkflow,
            "wf-1",
            GatewayError::Rejected {
                status: 500,
                message: "boom".into(),
            },
        );
        // wf-3 was recorded as updated but never backed up.
        let context = context_with(&["wf-1", "wf-2", "wf-3"], &["wf-1", "wf-2"]);

        let report = RollbackCoordinator::new(&credentials, &workflows)
            .rollback(&context)
            .await;

        assert_eq!(report.attempted(), 3);
        assert_eq!(report.restored(), 1);
        assert_eq!(report.left_patched(), vec![&wf_id("wf-1"), &wf_id("wf-3")]);
        assert_eq!(
            report.restores()[2].outcome,
            StepOutcome::failed("no backup captured")
        );
        assert_eq!(
            report.to_string(),
            "new credential cred-2 deleted; restored 1/3 updated workflows, left patched: wf-1, wf-3"
        );
        assert!(
            !workflows
                .calls()
                .contains(&GatewayCall::UpdateWorkflow { id: wf_id("wf-3") })
        );
    }

    #[test]
    fn step_outcome_from_result() {
        let ok: Result<(), GatewayError> = Ok(());
        assert_eq!(StepOutcome::from(ok), StepOutcome::Succeeded);

        let err: Result<(), GatewayError> = Err(GatewayError::Cancelled);
        assert_eq!(
            StepOutcome::from(err),
            StepOutcome::failed("request cancelled")
        );
    }
}
