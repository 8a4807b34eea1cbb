//! Discovery of workflows that reference a credential.

use rekey_core::CredentialId;

use crate::gateway::{GatewayError, GatewayResult, WorkflowGateway};

use super::backup::WorkflowBackup;

/// Lists every workflow and backs up the ones that reference a credential.
///
/// The scanner only reads. Compensating a failed scan (deleting the
/// replacement credential) is the orchestrator's job.
pub struct WorkflowScanner<'a, W: ?Sized> {
    workflows: &'a W,
}

impl<'a, W> WorkflowScanner<'a, W>
where
    W: WorkflowGateway + ?Sized,
{
    /// Create a scanner over the workflow gateway.
    pub fn new(workflows: &'a W) -> Self {
        Self { workflows }
    }

    /// Backups of every workflow referencing `credential_id`, in list order.
    ///
    /// Each backup is the definition returned by the list call itself. A
    /// referencing workflow without an id cannot be patched or restored,
    /// so it fails the scan.
    pub async fn scan(&self, credential_id: &CredentialId) -> GatewayResult<Vec<WorkflowBackup>> {
        let listed = self.workflows.list().await?;
        let total = listed.len();

        let mut affected = Vec::new();
        for definition in &listed {
            if !definition.references_credential(credential_id) {
                continue;
            }

            let Some(workflow_id) = definition.id.clone() else {
                return Err(GatewayError::Transport(format!(
                    "workflow {:?} references credential {credential_id} but has no id",
                    definition.name
                )));
            };

            tracing::debug!(
                %workflow_id,
                credential_types = ?definition.credential_types_for(credential_id),
                "workflow references credential"
            );
            affected.push(WorkflowBackup::capture(workflow_id, definition));
        }

        tracing::info!(
            %credential_id,
            scanned = total,
            affected = affected.len(),
            "found workflows using credential"
        );
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryWorkflows, Operation};
    use pretty_assertions::assert_eq;
    use rekey_core::WorkflowId;
    use rekey_workflow::{CredentialReference, NodeDefinition, WorkflowDefinition};
    use serde_json::json;

    fn cred(raw: &str) -> CredentialId {
        CredentialId::new(raw).unwrap()
    }

    fn wf_id(raw: &str) -> WorkflowId {
        WorkflowId::new(raw).unwrap()
    }

    fn workflow(id: &str, credential: &str) -> WorkflowDefinition {
        WorkflowDefinition::new(format!("workflow {id}"))
            .with_id(wf_id(id))
            .with_node(NodeDefinition::new("Post message").with_credential(
                "slackApi",
                CredentialReference::new(cred(credential), "Slack"),
            ))
    }

    #[tokio::test]
    async fn backs_up_only_referencing_workflows() {
        let workflows = InMemoryWorkflows::new()
            .with_workflow(workflow("wf-1", "cred-1"))
            .with_workflow(workflow("wf-2", "cred-9"))
            .with_workflow(
                WorkflowDefinition::new("broken")
                    .with_id(wf_id("wf-3"))
                    .with_node(NodeDefinition::new("n").with_raw_credential("slackApi", json!("cred-1"))),
            )
            .with_workflow(workflow("wf-4", "cred-1"));

        let backups = WorkflowScanner::new(&workflows)
            .scan(&cred("cred-1"))
            .await
            .unwrap();

        let ids: Vec<&WorkflowId> = backups.iter().map(WorkflowBackup::workflow_id).collect();
        assert_eq!(ids, vec![&wf_id("wf-1"), &wf_id("wf-4")]);
        assert_eq!(backups[0].snapshot(), &workflow("wf-1", "cred-1"));
    }

    #[tokio::test]
    async fn propagates_list_failure() {
        let workflows = InMemoryWorkflows::new().with_workflow(workflow("wf-1", "cred-1"));
        workflows.fail(Operation::ListWorkflows, GatewayError::Transport("reset".into()));

        let err = WorkflowScanner::new(&workflows)
            .scan(&cred("cred-1"))
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::Transport("reset".into()));
    }

    #[tokio::test]
    async fn referencing_workflow_without_id_fails() {
        let mut anonymous = workflow("wf-1", "cred-1");
        anonymous.id = None;
        let workflows = InMemoryWorkflows::new()
            .with_workflow(workflow("wf-2", "cred-1"))
            .with_listed(anonymous);

        let err = WorkflowScanner::new(&workflows)
            .scan(&cred("cred-1"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("has no id"), "{err}");
    }
}
