//! Testing utilities for credential rotation
//!
//! In-memory gateways that behave like a small platform: they store
//! credentials and workflows, record every call in order, and fail on
//! demand. Enabled with the `test-util` feature.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use async_trait::async_trait;
use parking_lot::Mutex;
use rekey_core::{CredentialId, WorkflowId};
use rekey_workflow::WorkflowDefinition;
use serde_json::{Map, Value};

use crate::gateway::{
    CreatedCredential, CredentialGateway, GatewayError, GatewayResult, NewCredential,
    WorkflowGateway,
};

/// Gateway operation, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateCredential,
    DeleteCredential,
    Schema,
    ListWorkflows,
    GetWorkflow,
    UpdateWorkflow,
}

/// Record of a gateway call, in the order calls were made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    CreateCredential { name: String },
    DeleteCredential { id: CredentialId },
    Schema { credential_type: String },
    ListWorkflows,
    GetWorkflow { id: WorkflowId },
    UpdateWorkflow { id: WorkflowId },
}

#[derive(Debug)]
struct FailureRule {
    operation: Operation,
    target: Option<String>,
    error: GatewayError,
    once: bool,
}

/// Injected failures, matched in insertion order.
#[derive(Debug, Default)]
struct Failures {
    rules: Mutex<Vec<FailureRule>>,
}

impl Failures {
    fn add(&self, operation: Operation, target: Option<String>, error: GatewayError, once: bool) {
        self.rules.lock().push(FailureRule {
            operation,
            target,
            error,
            once,
        });
    }

    fn check(&self, operation: Operation, target: Option<&str>) -> GatewayResult<()> {
        let mut rules = self.rules.lock();
        let matched = rules.iter().position(|rule| {
            rule.operation == operation
                && rule
                    .target
                    .as_deref()
                    .is_none_or(|wanted| Some(wanted) == target)
        });

        match matched {
            Some(index) if rules[index].once => Err(rules.remove(index).error),
            Some(index) => Err(rules[index].error.clone()),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredCredential {
    name: String,
    credential_type: String,
    data: Map<String, Value>,
}

/// In-memory [`CredentialGateway`].
///
/// Created credentials get ids from the [`issue_ids`](Self::issue_ids)
/// queue first, then `generated-1`, `generated-2`, and so on.
#[derive(Debug, Default)]
pub struct InMemoryCredentials {
    store: Mutex<HashMap<CredentialId, StoredCredential>>,
    issued: Mutex<VecDeque<CredentialId>>,
    generated: Mutex<u64>,
    schemas: HashMap<String, Value>,
    calls: Mutex<Vec<GatewayCall>>,
    failures: Failures,
}

impl InMemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a credential that already exists on the platform.
    pub fn with_existing(
        self,
        id: CredentialId,
        name: impl Into<String>,
        credential_type: impl Into<String>,
    ) -> Self {
        self.store.lock().insert(
            id,
            StoredCredential {
                name: name.into(),
                credential_type: credential_type.into(),
                data: Map::new(),
            },
        );
        self
    }

    /// Ids handed out by subsequent creates, in order.
    pub fn issue_ids<I>(self, ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.issued.lock().extend(
            ids.into_iter()
                .map(|raw| CredentialId::new(raw.as_ref()).expect("valid credential id")),
        );
        self
    }

    /// Serve `schema` for `credential_type`.
    pub fn with_schema(mut self, credential_type: impl Into<String>, schema: Value) -> Self {
        self.schemas.insert(credential_type.into(), schema);
        self
    }

    /// Fail every call to `operation`.
    pub fn fail(&self, operation: Operation, error: GatewayError) {
        self.failures.add(operation, None, error, false);
    }

    /// Fail the next call to `operation` only.
    pub fn fail_once(&self, operation: Operation, error: GatewayError) {
        self.failures.add(operation, None, error, true);
    }

    /// Fail calls to `operation` that address `target` (a credential id,
    /// or the display name for creates).
    pub fn fail_for(&self, operation: Operation, target: impl Into<String>, error: GatewayError) {
        self.failures.add(operation, Some(target.into()), error, false);
    }

    /// Whether a credential with this id currently exists.
    pub fn contains(&self, id: &CredentialId) -> bool {
        self.store.lock().contains_key(id)
    }

    /// The data a credential was created with.
    pub fn data_of(&self, id: &CredentialId) -> Option<Map<String, Value>> {
        self.store.lock().get(id).map(|stored| stored.data.clone())
    }

    /// The display name of a stored credential.
    pub fn name_of(&self, id: &CredentialId) -> Option<String> {
        self.store.lock().get(id).map(|stored| stored.name.clone())
    }

    /// The type of a stored credential.
    pub fn type_of(&self, id: &CredentialId) -> Option<String> {
        self.store
            .lock()
            .get(id)
            .map(|stored| stored.credential_type.clone())
    }

    /// Every call made so far.
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().clone()
    }

    fn record(&self, call: GatewayCall) {
        self.calls.lock().push(call);
    }

    fn next_id(&self) -> CredentialId {
        if let Some(id) = self.issued.lock().pop_front() {
            return id;
        }
        let mut generated = self.generated.lock();
        *generated += 1;
        CredentialId::new(format!("generated-{}", *generated)).expect("generated id is valid")
    }
}

#[async_trait]
impl CredentialGateway for InMemoryCredentials {
    async fn create(&self, credential: &NewCredential) -> GatewayResult<CreatedCredential> {
        self.record(GatewayCall::CreateCredential {
            name: credential.name.clone(),
        });
        self.failures
            .check(Operation::CreateCredential, Some(&credential.name))?;

        let id = self.next_id();
        self.store.lock().insert(
            id.clone(),
            StoredCredential {
                name: credential.name.clone(),
                credential_type: credential.credential_type.clone(),
                data: credential.data.clone(),
            },
        );

        Ok(CreatedCredential {
            id,
            name: credential.name.clone(),
            credential_type: credential.credential_type.clone(),
        })
    }

    async fn delete(&self, id: &CredentialId) -> GatewayResult<()> {
        self.record(GatewayCall::DeleteCredential { id: id.clone() });
        self.failures
            .check(Operation::DeleteCredential, Some(id.as_str()))?;

        self.store
            .lock()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| GatewayError::credential_not_found(id))
    }

    async fn schema(&self, credential_type: &str) -> GatewayResult<Option<Value>> {
        self.record(GatewayCall::Schema {
            credential_type: credential_type.to_string(),
        });
        self.failures.check(Operation::Schema, Some(credential_type))?;
        Ok(self.schemas.get(credential_type).cloned())
    }
}

type UpdateHook = Box<dyn Fn(&WorkflowId) + Send + Sync>;

/// In-memory [`WorkflowGateway`].
///
/// Workflows are listed in insertion order. Updates replace the stored
/// definition wholesale, like the platform does.
#[derive(Default)]
pub struct InMemoryWorkflows {
    store: Mutex<Vec<WorkflowDefinition>>,
    updates: Mutex<Vec<WorkflowId>>,
    calls: Mutex<Vec<GatewayCall>>,
    failures: Failures,
    on_update: Mutex<Option<UpdateHook>>,
}

impl fmt::Debug for InMemoryWorkflows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryWorkflows")
            .field("workflows", &self.store.lock().len())
            .field("updates", &self.updates.lock())
            .field("failures", &self.failures)
            .finish_non_exhaustive()
    }
}

impl InMemoryWorkflows {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a workflow. It must have an id.
    pub fn with_workflow(self, definition: WorkflowDefinition) -> Self {
        assert!(definition.id.is_some(), "seeded workflow needs an id");
        self.store.lock().push(definition);
        self
    }

    /// Seed a definition that only shows up in listings, e.g. one without
    /// an id.
    pub fn with_listed(self, definition: WorkflowDefinition) -> Self {
        self.store.lock().push(definition);
        self
    }

    /// Replace a stored workflow out of band, as a concurrent editor would.
    /// Does not count as a gateway call.
    pub fn put(&self, definition: WorkflowDefinition) {
        let mut store = self.store.lock();
        match store
            .iter_mut()
            .find(|stored| stored.id.is_some() && stored.id == definition.id)
        {
            Some(stored) => *stored = definition,
            None => store.push(definition),
        }
    }

    /// The stored definition of a workflow.
    pub fn stored(&self, id: &WorkflowId) -> Option<WorkflowDefinition> {
        self.store
            .lock()
            .iter()
            .find(|stored| stored.id.as_ref() == Some(id))
            .cloned()
    }

    /// Successful updates, in order.
    pub fn updates(&self) -> Vec<WorkflowId> {
        self.updates.lock().clone()
    }

    /// Every call made so far.
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().clone()
    }

    /// Fail every call to `operation`.
    pub fn fail(&self, operation: Operation, error: GatewayError) {
        self.failures.add(operation, None, error, false);
    }

    /// Fail the next call to `operation` only.
    pub fn fail_once(&self, operation: Operation, error: GatewayError) {
        self.failures.add(operation, None, error, true);
    }

    /// Fail calls to `operation` for one workflow id.
    pub fn fail_for(&self, operation: Operation, workflow_id: impl Into<String>, error: GatewayError) {
        self.failures
            .add(operation, Some(workflow_id.into()), error, false);
    }

    /// Fail the next call to `operation` for one workflow id.
    pub fn fail_once_for(
        &self,
        operation: Operation,
        workflow_id: impl Into<String>,
        error: GatewayError,
    ) {
        self.failures
            .add(operation, Some(workflow_id.into()), error, true);
    }

    /// Run `hook` after every successful update.
    pub fn on_update(&self, hook: impl Fn(&WorkflowId) + Send + Sync + 'static) {
        *self.on_update.lock() = Some(Box::new(hook));
    }

    fn record(&self, call: GatewayCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl WorkflowGateway for InMemoryWorkflows {
    async fn list(&self) -> GatewayResult<Vec<WorkflowDefinition>> {
        self.record(GatewayCall::ListWorkflows);
        self.failures.check(Operation::ListWorkflows, None)?;
        Ok(self.store.lock().clone())
    }

    async fn get(&self, id: &WorkflowId) -> GatewayResult<WorkflowDefinition> {
        self.record(GatewayCall::GetWorkflow { id: id.clone() });
        self.failures
            .check(Operation::GetWorkflow, Some(id.as_str()))?;
        self.stored(id)
            .ok_or_else(|| GatewayError::workflow_not_found(id))
    }

    async fn update(&self, id: &WorkflowId, definition: &WorkflowDefinition) -> GatewayResult<()> {
        self.record(GatewayCall::UpdateWorkflow { id: id.clone() });
        self.failures
            .check(Operation::UpdateWorkflow, Some(id.as_str()))?;

        {
            let mut store = self.store.lock();
            let stored = store
                .iter_mut()
                .find(|stored| stored.id.as_ref() == Some(id))
                .ok_or_else(|| GatewayError::workflow_not_found(id))?;
            *stored = definition.clone();
        }
        self.updates.lock().push(id.clone());

        if let Some(hook) = self.on_update.lock().as_ref() {
            hook(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn fail_once_applies_to_a_single_call() {
        let workflows = InMemoryWorkflows::new();
        workflows.fail_once(Operation::ListWorkflows, GatewayError::Cancelled);

        assert_eq!(workflows.list().await, Err(GatewayError::Cancelled));
        assert_eq!(workflows.list().await, Ok(Vec::new()));
        assert_eq!(
            workflows.calls(),
            vec![GatewayCall::ListWorkflows, GatewayCall::ListWorkflows]
        );
    }

    #[tokio::test]
    async fn issues_queued_then_generated_ids() {
        let credentials = InMemoryCredentials::new().issue_ids(["cred-2"]);
        let payload = NewCredential::new("Slack", "slackApi", Map::new());

        let first = credentials.create(&payload).await.unwrap();
        let second = credentials.create(&payload).await.unwrap();

        assert_eq!(first.id.as_str(), "cred-2");
        assert_eq!(second.id.as_str(), "generated-1");
        assert!(credentials.contains(&first.id));
    }

    #[tokio::test]
    async fn deleting_unknown_credential_is_not_found() {
        let credentials = InMemoryCredentials::new();
        let err = credentials
            .delete(&CredentialId::new("cred-404").unwrap())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
