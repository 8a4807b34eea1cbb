//! Remote-assigned identifiers.
//!
//! The automation platform hands out credential and workflow identifiers as
//! short opaque strings. Each identifier kind gets its own newtype so a
//! workflow id can never be passed where a credential id is expected.
//!
//! Validation is deliberately minimal: the platform owns the format, so the
//! only local rules are "not empty" and "not absurdly long".

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Maximum accepted identifier length in bytes.
pub const MAX_ID_LENGTH: usize = 255;

fn validate(kind: &'static str, id: &str) -> Result<(), CoreError> {
    if id.is_empty() {
        return Err(CoreError::EmptyId { kind });
    }
    if id.len() > MAX_ID_LENGTH {
        return Err(CoreError::IdTooLong {
            kind,
            len: id.len(),
            max: MAX_ID_LENGTH,
        });
    }
    Ok(())
}

macro_rules! define_remote_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a validated identifier.
            ///
            /// # Errors
            ///
            /// Returns [`CoreError::EmptyId`] for an empty string and
            /// [`CoreError::IdTooLong`] past [`MAX_ID_LENGTH`].
            pub fn new(id: impl Into<String>) -> Result<Self, CoreError> {
                let id = id.into();
                validate($kind, &id)?;
                Ok(Self(id))
            }

            /// Borrow the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the identifier and return the raw string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = CoreError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = CoreError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

define_remote_id!(
    /// Identifier of a credential stored on the automation platform.
    ///
    /// Only the platform issues these; locally they are parsed from API
    /// responses and workflow documents, never invented.
    CredentialId,
    "credential"
);

define_remote_id!(
    /// Identifier of a workflow. Stable for the lifetime of the workflow.
    WorkflowId,
    "workflow"
);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn credential_id_accepts_platform_format() {
        let id = CredentialId::new("R2d9xk1TqZ").unwrap();
        assert_eq!(id.as_str(), "R2d9xk1TqZ");
        assert_eq!(id.to_string(), "R2d9xk1TqZ");
    }

    #[test]
    fn empty_id_is_rejected() {
        assert_eq!(
            CredentialId::new(""),
            Err(CoreError::EmptyId { kind: "credential" })
        );
        assert_eq!(
            WorkflowId::new(String::new()),
            Err(CoreError::EmptyId { kind: "workflow" })
        );
    }

    #[test]
    fn overlong_id_is_rejected() {
        let long = "x".repeat(MAX_ID_LENGTH + 1);
        let err = WorkflowId::new(long).unwrap_err();
        assert_eq!(
            err,
            CoreError::IdTooLong {
                kind: "workflow",
                len: MAX_ID_LENGTH + 1,
                max: MAX_ID_LENGTH,
            }
        );
    }

    #[test]
    fn comparison_is_case_sensitive() {
        let id = CredentialId::new("abc").unwrap();
        assert!(id == "abc");
        assert!(id != "ABC");
        assert_ne!(id, CredentialId::new("ABC").unwrap());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = WorkflowId::new("wf-1").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"wf-1\"");

        let back: WorkflowId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn empty_string_does_not_deserialize() {
        let result: Result<CredentialId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }
}
