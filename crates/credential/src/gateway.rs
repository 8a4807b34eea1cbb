//! Capabilities consumed from the automation platform.
//!
//! The platform cannot update a credential in place and cannot read one back
//! after creation, so the credential side is create + delete only. Workflow
//! access is list / get / full replace.
//!
//! Implementations own transport, authentication and pagination; the
//! rotation saga only sees these traits.

use async_trait::async_trait;
use rekey_core::{CredentialId, WorkflowId};
use rekey_workflow::WorkflowDefinition;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors surfaced by gateway implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The addressed resource does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Resource kind (`credential`, `workflow`).
        kind: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// The platform understood the request and refused it.
    #[error("request rejected ({status}): {message}")]
    Rejected {
        /// HTTP-style status code reported by the platform.
        status: u16,
        /// Platform-provided message.
        message: String,
    },

    /// The request did not complete (network, timeout, decoding).
    #[error("transport error: {0}")]
    Transport(String),

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,
}

impl GatewayError {
    /// Build a [`GatewayError::NotFound`] for a credential.
    pub fn credential_not_found(id: &CredentialId) -> Self {
        Self::NotFound {
            kind: "credential",
            id: id.to_string(),
        }
    }

    /// Build a [`GatewayError::NotFound`] for a workflow.
    pub fn workflow_not_found(id: &WorkflowId) -> Self {
        Self::NotFound {
            kind: "workflow",
            id: id.to_string(),
        }
    }

    /// Whether the error means the resource is missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for gateway calls
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Payload for creating a credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCredential {
    /// Display name.
    pub name: String,
    /// Credential type, e.g. `slackApi`, `postgres`.
    #[serde(rename = "type")]
    pub credential_type: String,
    /// Secret material and settings. Never logged.
    pub data: Map<String, Value>,
}

impl NewCredential {
    /// Create a payload.
    pub fn new(
        name: impl Into<String>,
        credential_type: impl Into<String>,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            name: name.into(),
            credential_type: credential_type.into(),
            data,
        }
    }
}

/// What the platform returns after creating a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedCredential {
    /// Platform-assigned id.
    pub id: CredentialId,
    /// Display name as stored.
    pub name: String,
    /// Credential type as stored.
    #[serde(rename = "type")]
    pub credential_type: String,
}

/// Credential operations.
#[async_trait]
pub trait CredentialGateway: Send + Sync {
    /// Create a credential and return its platform id.
    async fn create(&self, credential: &NewCredential) -> GatewayResult<CreatedCredential>;

    /// Delete a credential by id.
    async fn delete(&self, id: &CredentialId) -> GatewayResult<()>;

    /// JSON schema for a credential type, if the platform exposes one.
    ///
    /// Used to coerce string inputs into numbers and booleans before
    /// creation. The default reports no schema.
    async fn schema(&self, _credential_type: &str) -> GatewayResult<Option<Value>> {
        Ok(None)
    }
}

/// Workflow operations.
#[async_trait]
pub trait WorkflowGateway: Send + Sync {
    /// Every workflow visible to the caller.
    async fn list(&self) -> GatewayResult<Vec<WorkflowDefinition>>;

    /// The current definition of one workflow.
    async fn get(&self, id: &WorkflowId) -> GatewayResult<WorkflowDefinition>;

    /// Replace the full definition of one workflow.
    async fn update(&self, id: &WorkflowId, definition: &WorkflowDefinition) -> GatewayResult<()>;
}
