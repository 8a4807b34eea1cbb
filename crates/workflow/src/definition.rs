//! Workflow-level document type.

use rekey_core::WorkflowId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::node::NodeDefinition;

/// A complete workflow document as exchanged with the platform.
///
/// `connections` and `settings` are opaque to rotation and kept as raw JSON.
/// Unknown top-level keys (`active`, `tags`, `pinData`, ...) are collected in
/// `extra` so the document survives a read-modify-write cycle.
///
/// The type owns all of its data, so [`Clone`] yields a structurally
/// independent copy. Rotation relies on this for its backups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Platform-assigned id. Present on every listed or fetched workflow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<WorkflowId>,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// The nodes of this workflow.
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
    /// Connection graph between nodes, keyed by source node name.
    #[serde(default)]
    pub connections: Map<String, Value>,
    /// Workflow settings.
    #[serde(default)]
    pub settings: Map<String, Value>,
    /// Any other top-level field.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkflowDefinition {
    /// Create an empty workflow with a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the platform id.
    #[must_use]
    pub fn with_id(mut self, id: WorkflowId) -> Self {
        self.id = Some(id);
        self
    }

    /// Append a node.
    #[must_use]
    pub fn with_node(mut self, node: NodeDefinition) -> Self {
        self.nodes.push(node);
        self
    }

    /// Set a workflow setting.
    #[must_use]
    pub fn with_setting(mut self, key: impl Into<String>, value: Value) -> Self {
        self.settings.insert(key.into(), value);
        self
    }

    /// Whether the document has no nodes at all.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
