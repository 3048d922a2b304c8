//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing an `EntryId` where an
//! `AccountId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(AccountId, "Unique identifier for a balance account.");
typed_id!(EntryId, "Unique identifier for a ledger entry.");
typed_id!(GrantId, "Unique identifier for an entitlement grant.");

/// Opaque identifier for a piece of paid content.
///
/// Content lives in an external catalog; the ledger never interprets the
/// value beyond equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(pub String);

impl ContentId {
    /// Wraps a caller-supplied content identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_typed_ids_are_distinct_types() {
        let account = AccountId::new();
        let entry = EntryId::new();
        assert_ne!(account.into_inner(), entry.into_inner());
    }

    #[test]
    fn test_id_roundtrip_via_string() {
        let id = AccountId::new();
        let parsed = AccountId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_ids_are_time_ordered() {
        // UUID v7 embeds a timestamp prefix, so later IDs sort after
        // earlier ones.
        let first = EntryId::new();
        let second = EntryId::new();
        assert!(second.into_inner() >= first.into_inner());
    }

    #[test]
    fn test_content_id_is_opaque_string() {
        let id = ContentId::from("video-42");
        assert_eq!(id.as_str(), "video-42");
        assert_eq!(id.to_string(), "video-42");
        assert_eq!(id, ContentId::new("video-42"));
    }
}
