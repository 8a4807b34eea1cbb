//! Rotation orchestrator
//!
//! Drives one rotation saga through its states and decides when to
//! compensate:
//!
//! 1. create the replacement credential (failure: abort, nothing to undo)
//! 2. scan workflows and back up the affected ones
//! 3. repoint affected workflows one at a time
//! 4. retire the old credential (failure: success with a cleanup warning)
//!
//! Any failure or cancellation in steps 2-3 runs the [`RollbackCoordinator`]
//! exactly once before the error is returned.

use std::fmt;
use std::sync::Arc;

use rekey_core::{CredentialId, WorkflowId};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::gateway::{CreatedCredential, CredentialGateway, NewCredential, WorkflowGateway};
use crate::schema::coerce_with_gateway;

use super::backup::RotationContext;
use super::error::{RotationError, RotationResult};
use super::policy::RotationPolicy;
use super::rollback::{RollbackCoordinator, RollbackReport, StepOutcome};
use super::scanner::WorkflowScanner;
use super::state::RotationState;
use super::throttle::ThrottleGate;
use super::updater::{PatchFailure, WorkflowUpdater};

/// What to rotate and what to replace it with.
#[derive(Clone)]
pub struct RotationRequest {
    /// The credential being replaced.
    pub old_credential_id: CredentialId,
    /// Display name for the replacement.
    pub name: String,
    /// Credential type, e.g. `slackApi`.
    pub credential_type: String,
    /// New secret material and settings.
    pub data: Map<String, Value>,
}

impl RotationRequest {
    /// Create a request.
    pub fn new(
        old_credential_id: CredentialId,
        name: impl Into<String>,
        credential_type: impl Into<String>,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            old_credential_id,
            name: name.into(),
            credential_type: credential_type.into(),
            data,
        }
    }
}

impl fmt::Debug for RotationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&String> = self.data.keys().collect();
        f.debug_struct("RotationRequest")
            .field("old_credential_id", &self.old_credential_id)
            .field("name", &self.name)
            .field("credential_type", &self.credential_type)
            .field("data", &format_args!("<redacted {keys:?}>"))
            .finish()
    }
}

/// Result of a successful rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationOutcome {
    /// The replacement credential, now referenced by every affected workflow.
    pub new_credential: CreatedCredential,
    /// Workflows repointed to the replacement, in update order.
    pub updated_workflows: Vec<WorkflowId>,
    /// The credential that was retired (or should have been).
    pub old_credential_id: CredentialId,
    /// Outcome of deleting the old credential.
    pub retirement: StepOutcome,
}

impl RotationOutcome {
    /// Whether the old credential still exists and must be removed by hand.
    pub fn needs_manual_cleanup(&self) -> bool {
        !self.retirement.is_success()
    }

    /// The old credential, if retiring it failed.
    pub fn stale_credential(&self) -> Option<&CredentialId> {
        self.needs_manual_cleanup().then_some(&self.old_credential_id)
    }
}

/// Saga state with validated transitions.
#[derive(Debug)]
struct SagaState {
    current: RotationState,
}

impl SagaState {
    fn new() -> Self {
        Self {
            current: RotationState::Idle,
        }
    }

    fn advance(&mut self, target: RotationState) -> RotationResult<()> {
        self.current = self.current.transition_to(target)?;
        tracing::debug!(state = %self.current, "rotation state changed");
        Ok(())
    }
}

/// Rotates credentials on a platform that cannot update them in place.
///
/// One invocation rotates one credential. Independent rotations can run
/// concurrently on clones of the same rotator: no state is shared between
/// invocations apart from the gateways.
///
/// # Example
///
/// ```ignore
/// let rotator = CredentialRotator::new(credentials, workflows)
///     .with_policy(RotationPolicy::default().with_max_workflows(100));
///
/// let outcome = rotator
///     .rotate(RotationRequest::new(old_id, "Slack", "slackApi", data), &cancel)
///     .await?;
/// println!("now using {}", outcome.new_credential.id);
/// ```
pub struct CredentialRotator<C: ?Sized, W: ?Sized> {
    credentials: Arc<C>,
    workflows: Arc<W>,
    policy: RotationPolicy,
}

impl<C: ?Sized, W: ?Sized> Clone for CredentialRotator<C, W> {
    fn clone(&self) -> Self {
        Self {
            credentials: Arc::clone(&self.credentials),
            workflows: Arc::clone(&self.workflows),
            policy: self.policy.clone(),
        }
    }
}

impl<C, W> CredentialRotator<C, W>
where
    C: CredentialGateway + ?Sized,
    W: WorkflowGateway + ?Sized,
{
    /// Create a rotator with the default policy.
    pub fn new(credentials: Arc<C>, workflows: Arc<W>) -> Self {
        Self {
            credentials,
            workflows,
            policy: RotationPolicy::default(),
        }
    }

    /// Replace the policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RotationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The active policy.
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Rotate `request.old_credential_id` to a newly created credential.
    ///
    /// On success every affected workflow references the replacement. On
    /// error the returned [`RotationError`] carries the rollback report when
    /// compensation ran; the old credential is never deleted on any error
    /// path.
    pub async fn rotate(
        &self,
        request: RotationRequest,
        cancel: &CancellationToken,
    ) -> RotationResult<RotationOutcome> {
        let span = tracing::info_span!(
            "credential_rotation",
            old_credential_id = %request.old_credential_id,
            credential_type = %request.credential_type,
            new_credential_id = tracing::field::Empty,
        );

        let result = self.run(request, cancel).instrument(span.clone()).await;
        if let Err(error) = &result {
            span.in_scope(|| tracing::error!(%error, "credential rotation failed"));
        }
        result
    }

    async fn run(
        &self,
        request: RotationRequest,
        cancel: &CancellationToken,
    ) -> RotationResult<RotationOutcome> {
        self.policy.validate()?;
        let RotationRequest {
            old_credential_id,
            name,
            credential_type,
            data,
        } = request;

        let mut state = SagaState::new();
        if cancel.is_cancelled() {
            return Err(RotationError::Cancelled { rollback: None });
        }

        // Create
        state.advance(RotationState::CreatingCredential)?;
        let data = if self.policy.coerce_data_types {
            coerce_with_gateway(self.credentials.as_ref(), &credential_type, data).await
        } else {
            data
        };
        let payload = NewCredential::new(name, credential_type, data);
        let new_credential = match self.credentials.create(&payload).await {
            Ok(created) => created,
            Err(source) => {
                state.advance(RotationState::Failed)?;
                return Err(RotationError::CreateFailed { source });
            }
        };
        tracing::Span::current().record(
            "new_credential_id",
            tracing::field::display(&new_credential.id),
        );
        tracing::info!(new_credential_id = %new_credential.id, "created replacement credential");

        let mut context = RotationContext::new(old_credential_id.clone(), new_credential.id.clone());

        // Scan
        state.advance(RotationState::ScanningWorkflows)?;
        let backups = match WorkflowScanner::new(self.workflows.as_ref())
            .scan(&old_credential_id)
            .await
        {
            Ok(backups) => backups,
            Err(source) => {
                let rollback = self.compensate(&mut state, &context).await?;
                return Err(RotationError::ScanFailed { source, rollback });
            }
        };

        if let Some(limit) = self.policy.max_workflows_per_rotation
            && backups.len() > limit
        {
            let found = backups.len();
            let rollback = self.compensate(&mut state, &context).await?;
            return Err(RotationError::TooManyWorkflows {
                credential_id: old_credential_id,
                found,
                limit,
                rollback,
            });
        }
        context.set_backups(backups);

        if cancel.is_cancelled() {
            let rollback = self.compensate(&mut state, &context).await?;
            return Err(RotationError::Cancelled {
                rollback: Some(rollback),
            });
        }

        // Update
        state.advance(RotationState::UpdatingWorkflows)?;
        let mut updater = WorkflowUpdater::new(
            self.workflows.as_ref(),
            ThrottleGate::new(self.policy.throttle_delay),
        );
        if let Err(failure) = updater.apply(&mut context, cancel).await {
            tracing::warn!(%failure, updated = context.updated().len(), "workflow update loop stopped");
            let rollback = self.compensate(&mut state, &context).await?;
            return Err(match failure {
                PatchFailure::Fetch {
                    workflow_id,
                    source,
                } => RotationError::PatchFetchFailed {
                    workflow_id,
                    source,
                    rollback,
                },
                PatchFailure::Apply {
                    workflow_id,
                    source,
                } => RotationError::PatchApplyFailed {
                    workflow_id,
                    source,
                    rollback,
                },
                PatchFailure::Cancelled { .. } => RotationError::Cancelled {
                    rollback: Some(rollback),
                },
            });
        }

        // Retire
        state.advance(RotationState::RetiringOldCredential)?;
        let retirement = StepOutcome::from(self.credentials.delete(&old_credential_id).await);
        if let Some(reason) = retirement.failure_reason() {
            tracing::warn!(
                %old_credential_id,
                reason,
                "could not delete old credential, manual cleanup required"
            );
        }

        state.advance(RotationState::Completed)?;
        let updated_workflows = context.into_updated();
        tracing::info!(
            updated = updated_workflows.len(),
            retired = retirement.is_success(),
            "credential rotation completed"
        );

        Ok(RotationOutcome {
            new_credential,
            updated_workflows,
            old_credential_id,
            retirement,
        })
    }

    async fn compensate(
        &self,
        state: &mut SagaState,
        context: &RotationContext,
    ) -> RotationResult<RollbackReport> {
        state.advance(RotationState::RollingBack)?;
        let report = RollbackCoordinator::new(self.credentials.as_ref(), self.workflows.as_ref())
            .rollback(context)
            .await;
        state.advance(RotationState::Failed)?;
        Ok(report)
    }
}
