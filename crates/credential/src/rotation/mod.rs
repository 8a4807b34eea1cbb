//! Credential rotation saga
//!
//! create → scan → patch-and-apply → retire, with compensating rollback.
//! See [`CredentialRotator`] for the entry point.

pub mod backup;
pub mod error;
pub mod policy;
pub mod rollback;
pub mod rotator;
pub mod scanner;
pub mod state;
pub mod throttle;
pub mod updater;

pub use backup::{RotationContext, WorkflowBackup};
pub use error::{RotationError, RotationResult};
pub use policy::{DEFAULT_THROTTLE_DELAY, MAX_THROTTLE_DELAY, RotationPolicy};
pub use rollback::{RestoreOutcome, RollbackCoordinator, RollbackReport, StepOutcome};
pub use rotator::{CredentialRotator, RotationOutcome, RotationRequest};
pub use scanner::WorkflowScanner;
pub use state::RotationState;
pub use throttle::{Cancelled, ThrottleGate};
pub use updater::{PatchFailure, WorkflowUpdater};
