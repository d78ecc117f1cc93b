//! Newtype domain identifiers.
//!
//! Every domain concept that has an identity is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging, for example,
//! a [`PrNumber`] with a [`CommentId`] even though both are `u64` under the hood.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Macro for u64-wrapped newtypes (GitHub-assigned integers).
// Generates: struct (Copy), new(), as_u64(), Display, From<u64>.
// ---------------------------------------------------------------------------
macro_rules! u64_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new identifier from a raw integer.
            pub fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the underlying integer value.
            pub fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: GitHub-integer-backed
// ---------------------------------------------------------------------------

u64_id! {
    /// Identifies a pull request within a repository.
    ///
    /// Issue comments on a pull request carry the same number as the pull
    /// request itself, so this type is used for both event kinds.
    PrNumber
}

u64_id! {
    /// Identifies an issue or pull-request comment.
    CommentId
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies one invocation of the orchestrator binary.
///
/// Generated fresh for every CLI invocation; recorded on the root span and in
/// the emitted job document so all activity from a single run can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers: String-backed (configuration / GitHub names)
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies a project declared in `digger.yml`.
    ///
    /// Project names are unique within one configuration.
    ProjectName
}

string_id! {
    /// Identifies a named workflow declared under `workflows:` in `digger.yml`.
    WorkflowName
}

string_id! {
    /// Identifies a GitHub repository in `"owner/repo"` format.
    ///
    /// Every job belongs to exactly one namespace.
    Namespace
}

string_id! {
    /// The GitHub login of the user whose action triggered an event.
    Actor
}

impl WorkflowName {
    /// Name of the workflow used by projects that do not name one.
    pub const DEFAULT: &'static str = "default";

    /// Returns the [`WorkflowName::DEFAULT`] workflow name.
    pub fn default_name() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl Namespace {
    /// Splits the namespace into `(owner, repo)`.
    ///
    /// Returns `None` unless the value has exactly one `/` with non-empty
    /// text on both sides.
    pub fn split(&self) -> Option<(&str, &str)> {
        let (owner, repo) = self.0.split_once('/')?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return None;
        }
        Some((owner, repo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_ids_reject_empty_values() {
        assert!(ProjectName::new("").is_none());
        assert_eq!(ProjectName::new("prod").unwrap().as_str(), "prod");
    }

    #[test]
    fn namespace_splits_owner_and_repo() {
        let ns = Namespace::new("diggerhq/demo").unwrap();
        assert_eq!(ns.split(), Some(("diggerhq", "demo")));
    }

    #[test]
    fn namespace_split_rejects_malformed_values() {
        for raw in ["demo", "/demo", "diggerhq/", "a/b/c"] {
            let ns = Namespace::new(raw).unwrap();
            assert_eq!(ns.split(), None, "{raw}");
        }
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&PrNumber::new(42)).unwrap();
        assert_eq!(json, "42");
        let name: WorkflowName = serde_json::from_str("\"default\"").unwrap();
        assert_eq!(name.as_str(), "default");
    }
}
