//! Sequential repointing of affected workflows.

use rekey_core::WorkflowId;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::gateway::{GatewayError, WorkflowGateway};

use super::backup::RotationContext;
use super::throttle::ThrottleGate;

/// Why the update loop stopped early.
///
/// The updater never compensates. Whatever it managed to update is already
/// recorded in the [`RotationContext`] when this is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchFailure {
    /// Reading the current definition failed.
    #[error("could not read workflow {workflow_id}: {source}")]
    Fetch {
        workflow_id: WorkflowId,
        source: GatewayError,
    },

    /// Pushing the patched definition failed.
    #[error("could not update workflow {workflow_id}: {source}")]
    Apply {
        workflow_id: WorkflowId,
        source: GatewayError,
    },

    /// Cancelled before `workflow_id` was touched.
    #[error("cancelled before workflow {workflow_id}")]
    Cancelled { workflow_id: WorkflowId },
}

/// Patches every backed-up workflow to point at the replacement credential.
///
/// Workflows are processed strictly one at a time, in backup order. Each
/// patch is applied to a freshly fetched definition, never to the backup,
/// so edits made since the scan survive.
pub struct WorkflowUpdater<'a, W: ?Sized> {
    workflows: &'a W,
    throttle: ThrottleGate,
}

impl<'a, W> WorkflowUpdater<'a, W>
where
    W: WorkflowGateway + ?Sized,
{
    /// Create an updater that paces itself with `throttle`.
    pub fn new(workflows: &'a W, throttle: ThrottleGate) -> Self {
        Self {
            workflows,
            throttle,
        }
    }

    /// Repoint every workflow in `context.backups()`.
    ///
    /// Stops at the first failure or cancellation; each success is appended
    /// to `context.updated()` as soon as the platform acknowledges it.
    pub async fn apply(
        &mut self,
        context: &mut RotationContext,
        cancel: &CancellationToken,
    ) -> Result<(), PatchFailure> {
        let targets: Vec<WorkflowId> = context
            .backups()
            .iter()
            .map(|backup| backup.workflow_id().clone())
            .collect();
        let old = context.old_credential_id().clone();
        let new = context.new_credential_id().clone();

        for workflow_id in targets {
            if self.throttle.wait(cancel).await.is_err() {
                return Err(PatchFailure::Cancelled { workflow_id });
            }

            let mut current = match self.workflows.get(&workflow_id).await {
                Ok(definition) => definition,
                Err(source) => return Err(PatchFailure::Fetch { workflow_id, source }),
            };

            let replaced = current.replace_credential(&old, &new);
            if replaced == 0 {
                tracing::debug!(%workflow_id, "workflow no longer references the old credential");
            }

            if cancel.is_cancelled() {
                return Err(PatchFailure::Cancelled { workflow_id });
            }

            if let Err(source) = self.workflows.update(&workflow_id, &current).await {
                return Err(PatchFailure::Apply { workflow_id, source });
            }

            tracing::info!(%workflow_id, replaced, "updated workflow to use new credential");
            context.record_updated(workflow_id);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::backup::WorkflowBackup;
    use crate::testing::{GatewayCall, InMemoryWorkflows, Operation};
    use pretty_assertions::assert_eq;
    use rekey_core::CredentialId;
    use rekey_workflow::{CredentialReference, NodeDefinition, WorkflowDefinition};
    use serde_json::json;
    use std::time::Duration;

    fn cred(raw: &str) -> CredentialId {
        CredentialId::new(raw).unwrap()
    }

    fn wf_id(raw: &str) -> WorkflowId {
        WorkflowId::new(raw).unwrap()
    }

    fn workflow(id: &str, credential: &str) -> WorkflowDefinition {
        WorkflowDefinition::new(format!("workflow {id}"))
            .with_id(wf_id(id))
            .with_node(NodeDefinition::new("Query").with_credential(
                "postgres",
                CredentialReference::new(cred(credential), "Postgres")
                    .with_field("type", json!("postgres")),
            ))
    }

    fn context_for(workflows: &InMemoryWorkflows, ids: &[&str]) -> RotationContext {
        let mut context = RotationContext::new(cred("cred-1"), cred("cred-2"));
        context.set_backups(
            ids.iter()
                .map(|id| {
                    let snapshot = workflows.stored(&wf_id(id)).unwrap();
                    WorkflowBackup::capture(wf_id(id), &snapshot)
                })
                .collect(),
        );
        context
    }

    #[tokio::test]
    async fn patches_fresh_definition_not_backup() {
        let workflows = InMemoryWorkflows::new().with_workflow(workflow("wf-1", "cred-1"));
        let mut context = context_for(&workflows, &["wf-1"]);

        // Someone renames the workflow after the scan.
        let mut drifted = workflow("wf-1", "cred-1");
        drifted.name = "renamed after scan".into();
        workflows.put(drifted);

        WorkflowUpdater::new(&workflows, ThrottleGate::new(Duration::ZERO))
            .apply(&mut context, &CancellationToken::new())
            .await
            .unwrap();

        let stored = workflows.stored(&wf_id("wf-1")).unwrap();
        assert_eq!(stored.name, "renamed after scan");
        assert!(stored.references_credential(&cred("cred-2")));
        assert_eq!(context.updated(), &[wf_id("wf-1")]);
        assert_eq!(
            context.backup_for(&wf_id("wf-1")).unwrap().snapshot().name,
            "workflow wf-1"
        );
    }

    #[tokio::test]
    async fn stops_at_first_apply_failure() {
        let workflows = InMemoryWorkflows::new()
            .with_workflow(workflow("wf-1", "cred-1"))
            .with_workflow(workflow("wf-2", "cred-1"))
            .with_workflow(workflow("wf-3", "cred-1"));
        workflows.fail_for(
            Operation::UpdateWorkflow,
            "wf-2",
            GatewayError::Transport("reset".into()),
        );
        let mut context = context_for(&workflows, &["wf-1", "wf-2", "wf-3"]);

        let failure = WorkflowUpdater::new(&workflows, ThrottleGate::new(Duration::ZERO))
            .apply(&mut context, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(
            failure,
            PatchFailure::Apply {
                workflow_id: wf_id("wf-2"),
                source: GatewayError::Transport("reset".into()),
            }
        );
        assert_eq!(context.updated(), &[wf_id("wf-1")]);
        assert!(
            !workflows
                .calls()
                .contains(&GatewayCall::GetWorkflow { id: wf_id("wf-3") })
        );
    }

    #[tokio::test]
    async fn fetch_failure_is_reported_with_workflow_id() {
        let workflows = InMemoryWorkflows::new().with_workflow(workflow("wf-1", "cred-1"));
        workflows.fail_for(
            Operation::GetWorkflow,
            "wf-1",
            GatewayError::workflow_not_found(&wf_id("wf-1")),
        );
        let mut context = context_for(&workflows, &["wf-1"]);

        let failure = WorkflowUpdater::new(&workflows, ThrottleGate::new(Duration::ZERO))
            .apply(&mut context, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(failure, PatchFailure::Fetch { ref workflow_id, .. } if *workflow_id == wf_id("wf-1")));
        assert!(context.updated().is_empty());
    }

    #[tokio::test]
    async fn cancellation_before_next_workflow() {
        let workflows = InMemoryWorkflows::new()
            .with_workflow(workflow("wf-1", "cred-1"))
            .with_workflow(workflow("wf-2", "cred-1"));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        workflows.on_update(move |_| trigger.cancel());
        let mut context = context_for(&workflows, &["wf-1", "wf-2"]);

        let failure = WorkflowUpdater::new(&workflows, ThrottleGate::new(Duration::ZERO))
            .apply(&mut context, &cancel)
            .await
            .unwrap_err();

        assert_eq!(failure, PatchFailure::Cancelled { workflow_id: wf_id("wf-2") });
        assert_eq!(context.updated(), &[wf_id("wf-1")]);
        assert_eq!(workflows.updates(), vec![wf_id("wf-1")]);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn throttles_between_updates_only() {
        let workflows = InMemoryWorkflows::new()
            .with_workflow(workflow("wf-1", "cred-1"))
            .with_workflow(workflow("wf-2", "cred-1"))
            .with_workflow(workflow("wf-3", "cred-1"));
        let mut context = context_for(&workflows, &["wf-1", "wf-2", "wf-3"]);

        let start = tokio::time::Instant::now();
        WorkflowUpdater::new(&workflows, ThrottleGate::new(Duration::from_millis(100)))
            .apply(&mut context, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(start.elapsed(), Duration::from_millis(200));
        assert_eq!(workflows.updates().len(), 3);
    }
}
