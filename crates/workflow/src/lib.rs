#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Rekey Workflow
//!
//! The slice of a platform workflow document that credential rotation needs
//! to understand, and nothing more.
//!
//! A workflow is an externally owned document: a node list, a connection
//! graph and settings. The only part interpreted here is each node's
//! `credentials` map, from credential-type name to a reference object. All
//! other content is carried through untouched so a fetched document can be
//! pushed back without losing fields this crate does not know about.
//!
//! - [`WorkflowDefinition`] and [`NodeDefinition`] for the document shape
//! - [`CredentialSlot`] and [`CredentialReference`] for typed references
//! - [`matcher`] for finding and rewriting references to a credential id

pub mod definition;
pub mod matcher;
pub mod node;
pub mod reference;

pub use definition::WorkflowDefinition;
pub use matcher::{references, replace};
pub use node::NodeDefinition;
pub use reference::{CredentialReference, CredentialSlot};
