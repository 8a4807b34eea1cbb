//! Node (step) definition within a workflow.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::reference::{CredentialReference, CredentialSlot};

/// A single node of a workflow document.
///
/// Only `credentials` is typed. Everything else the platform stores on a
/// node (`id`, `name`, `type`, `parameters`, `position`, ...) lives in
/// `extra` and round-trips untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Credential-type name to reference, e.g. `"slackApi" -> {id, name}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<IndexMap<String, CredentialSlot>>,
    /// All other node fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeDefinition {
    /// Create a node with a display name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let mut extra = Map::new();
        extra.insert("name".to_owned(), Value::String(name.into()));
        Self {
            credentials: None,
            extra,
        }
    }

    /// Attach a credential reference under a credential-type name.
    #[must_use]
    pub fn with_credential(
        mut self,
        credential_type: impl Into<String>,
        reference: CredentialReference,
    ) -> Self {
        self.credentials
            .get_or_insert_with(IndexMap::new)
            .insert(credential_type.into(), CredentialSlot::Reference(reference));
        self
    }

    /// Attach a raw credential entry, kept exactly as given.
    #[must_use]
    pub fn with_raw_credential(mut self, credential_type: impl Into<String>, raw: Value) -> Self {
        let slot = serde_json::from_value(raw.clone()).unwrap_or(CredentialSlot::Malformed(raw));
        self.credentials
            .get_or_insert_with(IndexMap::new)
            .insert(credential_type.into(), slot);
        self
    }

    /// Set an arbitrary node field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Node display name, if present.
    pub fn name(&self) -> Option<&str> {
        self.extra.get("name").and_then(Value::as_str)
    }

    /// Iterate over `(credential type, slot)` pairs.
    pub fn credential_slots(&self) -> impl Iterator<Item = (&str, &CredentialSlot)> {
        self.credentials
            .iter()
            .flatten()
            .map(|(ty, slot)| (ty.as_str(), slot))
    }
}
