//! Finding and rewriting credential references.
//!
//! A workflow references a credential when at least one node has a
//! well-formed entry in its `credentials` map whose `id` equals the
//! credential id exactly. Malformed entries never match and are never
//! rewritten.
//!
//! Everything here is pure: no I/O, deterministic, and [`replace`] is
//! idempotent for a fixed `(old, new)` pair.

use rekey_core::CredentialId;

use crate::definition::WorkflowDefinition;
use crate::node::NodeDefinition;

/// Whether any node of `definition` references `credential_id`.
pub fn references(definition: &WorkflowDefinition, credential_id: &CredentialId) -> bool {
    definition.references_credential(credential_id)
}

/// Rewrite every reference to `old` so it points at `new`.
///
/// Only the `id` of matching entries changes; names and other fields stay
/// as they were. A definition without nodes is returned unchanged.
pub fn replace(
    mut definition: WorkflowDefinition,
    old: &CredentialId,
    new: &CredentialId,
) -> WorkflowDefinition {
    definition.replace_credential(old, new);
    definition
}

/// [`references`] for a possibly absent definition. Absent never matches.
pub fn references_opt(definition: Option<&WorkflowDefinition>, credential_id: &CredentialId) -> bool {
    definition.is_some_and(|d| references(d, credential_id))
}

/// [`replace`] for a possibly absent definition. Absent stays absent.
pub fn replace_opt(
    definition: Option<WorkflowDefinition>,
    old: &CredentialId,
    new: &CredentialId,
) -> Option<WorkflowDefinition> {
    definition.map(|d| replace(d, old, new))
}

impl NodeDefinition {
    /// Whether this node references `credential_id`.
    pub fn references_credential(&self, credential_id: &CredentialId) -> bool {
        self.credential_slots()
            .any(|(_, slot)| slot.points_to(credential_id))
    }

    /// Repoint matching references from `old` to `new`; returns how many
    /// entries changed.
    pub fn replace_credential(&mut self, old: &CredentialId, new: &CredentialId) -> usize {
        let Some(credentials) = self.credentials.as_mut() else {
            return 0;
        };

        let mut replaced = 0;
        for reference in credentials
            .values_mut()
            .filter_map(|slot| slot.as_reference_mut())
        {
            if reference.id() == old {
                reference.set_id(new.clone());
                replaced += 1;
            }
        }
        replaced
    }
}

impl WorkflowDefinition {
    /// Whether any node references `credential_id`.
    pub fn references_credential(&self, credential_id: &CredentialId) -> bool {
        self.nodes
            .iter()
            .any(|node| node.references_credential(credential_id))
    }

    /// Repoint every reference from `old` to `new` in place; returns the
    /// number of entries rewritten across all nodes.
    pub fn replace_credential(&mut self, old: &CredentialId, new: &CredentialId) -> usize {
        if old == new {
            return 0;
        }
        self.nodes
            .iter_mut()
            .map(|node| node.replace_credential(old, new))
            .sum()
    }

    /// Credential-type names under which `credential_id` is referenced, in
    /// node order.
    pub fn credential_types_for(&self, credential_id: &CredentialId) -> Vec<&str> {
        self.nodes
            .iter()
            .flat_map(NodeDefinition::credential_slots)
            .filter(|(_, slot)| slot.points_to(credential_id))
            .map(|(ty, _)| ty)
            .collect()
    }
}
