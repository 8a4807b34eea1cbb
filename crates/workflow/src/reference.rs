//! Typed credential references inside a node's `credentials` map.

use rekey_core::CredentialId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of a node's `credentials` map.
///
/// Entries that look like a reference (an object with a non-empty string
/// `id`) become [`CredentialSlot::Reference`]. Anything else is kept
/// verbatim as [`CredentialSlot::Malformed`]: it never matches a credential
/// id and is written back exactly as it was read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CredentialSlot {
    /// A well-formed reference to a stored credential.
    Reference(CredentialReference),
    /// An entry whose shape was not understood.
    Malformed(Value),
}

impl CredentialSlot {
    /// The reference, if this entry is well-formed.
    pub fn as_reference(&self) -> Option<&CredentialReference> {
        match self {
            Self::Reference(reference) => Some(reference),
            Self::Malformed(_) => None,
        }
    }

    /// Mutable access to the reference, if this entry is well-formed.
    pub fn as_reference_mut(&mut self) -> Option<&mut CredentialReference> {
        match self {
            Self::Reference(reference) => Some(reference),
            Self::Malformed(_) => None,
        }
    }

    /// Whether this entry is a reference to exactly `id`.
    pub fn points_to(&self, id: &CredentialId) -> bool {
        self.as_reference().is_some_and(|r| r.id() == id)
    }
}

impl From<CredentialReference> for CredentialSlot {
    fn from(reference: CredentialReference) -> Self {
        Self::Reference(reference)
    }
}

/// A reference from a node to a stored credential.
///
/// `id` is the only field rotation rewrites. Every other key of the
/// original object (`name`, metadata the platform adds later) is kept in
/// `fields` and serialized back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialReference {
    id: CredentialId,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl CredentialReference {
    /// Build a reference carrying the display name the platform expects.
    pub fn new(id: CredentialId, name: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("name".to_owned(), Value::String(name.into()));
        Self { id, fields }
    }

    /// Add or overwrite an additional field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// The referenced credential.
    pub fn id(&self) -> &CredentialId {
        &self.id
    }

    /// Point this reference at another credential, leaving all other
    /// fields untouched.
    pub fn set_id(&mut self, id: CredentialId) {
        self.id = id;
    }

    /// Display name recorded alongside the id, if it is a string.
    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    /// Every field except `id`.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}
