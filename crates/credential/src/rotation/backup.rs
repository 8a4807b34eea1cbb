//! Workflow backups and per-rotation context.
//!
//! A backup is the authoritative pre-rotation state of one workflow. It is
//! captured as a deep copy at scan time, before any write to that workflow,
//! and is read-only afterwards: the working copy that gets patched and
//! pushed is always a separate value fetched later.

use rekey_core::{CredentialId, WorkflowId};
use rekey_workflow::WorkflowDefinition;

/// Immutable snapshot of a workflow taken before rotation touched it.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowBackup {
    workflow_id: WorkflowId,
    snapshot: WorkflowDefinition,
}

impl WorkflowBackup {
    /// Capture a structurally independent copy of `definition`.
    pub fn capture(workflow_id: WorkflowId, definition: &WorkflowDefinition) -> Self {
        Self {
            workflow_id,
            snapshot: definition.clone(),
        }
    }

    /// The workflow this backup belongs to.
    pub fn workflow_id(&self) -> &WorkflowId {
        &self.workflow_id
    }

    /// The definition as it was at scan time.
    pub fn snapshot(&self) -> &WorkflowDefinition {
        &self.snapshot
    }
}

/// State of one rotation invocation.
///
/// Lives for a single saga run and is never shared: backups are set once
/// after the scan, and the updated list only grows, in update order.
#[derive(Debug, Clone)]
pub struct RotationContext {
    old_credential_id: CredentialId,
    new_credential_id: CredentialId,
    backups: Vec<WorkflowBackup>,
    updated: Vec<WorkflowId>,
}

impl RotationContext {
    /// Start a context once the replacement credential exists.
    pub fn new(old_credential_id: CredentialId, new_credential_id: CredentialId) -> Self {
        Self {
            old_credential_id,
            new_credential_id,
            backups: Vec::new(),
            updated: Vec::new(),
        }
    }

    /// The credential being retired.
    pub fn old_credential_id(&self) -> &CredentialId {
        &self.old_credential_id
    }

    /// The replacement credential.
    pub fn new_credential_id(&self) -> &CredentialId {
        &self.new_credential_id
    }

    /// Backups of every affected workflow, in scan order.
    pub fn backups(&self) -> &[WorkflowBackup] {
        &self.backups
    }

    /// Workflows successfully repointed so far, in update order.
    pub fn updated(&self) -> &[WorkflowId] {
        &self.updated
    }

    /// The backup captured for `workflow_id`, if any.
    pub fn backup_for(&self, workflow_id: &WorkflowId) -> Option<&WorkflowBackup> {
        self.backups.iter().find(|b| b.workflow_id() == workflow_id)
    }

    pub(crate) fn set_backups(&mut self, backups: Vec<WorkflowBackup>) {
        self.backups = backups;
    }

    pub(crate) fn record_updated(&mut self, workflow_id: WorkflowId) {
        self.updated.push(workflow_id);
    }

    pub(crate) fn into_updated(self) -> Vec<WorkflowId> {
        self.updated
    }
}
