//! Entitlement grant records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_shared::types::{AccountId, ContentId, EntryId, GrantId};

/// A permanent content unlock backed by a committed purchase entry.
///
/// At most one live (unrevoked) grant exists per `(account, content)` pair.
/// Revocation happens only through reversal of the purchase entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// Unique identifier for the grant.
    pub id: GrantId,
    /// The account holding the entitlement.
    pub account_id: AccountId,
    /// The unlocked content.
    pub content_id: ContentId,
    /// The purchase entry that paid for this grant.
    pub source_entry_id: EntryId,
    /// When access was granted.
    pub granted_at: DateTime<Utc>,
    /// When the grant was revoked, if ever.
    pub revoked_at: Option<DateTime<Utc>>,
    /// The reversal entry that revoked the grant.
    pub revoked_by_entry_id: Option<EntryId>,
}

impl Grant {
    /// Returns true if the grant has not been revoked.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.revoked_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_liveness() {
        let mut grant = Grant {
            id: GrantId::new(),
            account_id: AccountId::new(),
            content_id: ContentId::from("v1"),
            source_entry_id: EntryId::new(),
            granted_at: Utc::now(),
            revoked_at: None,
            revoked_by_entry_id: None,
        };
        assert!(grant.is_live());

        grant.revoked_at = Some(Utc::now());
        assert!(!grant.is_live());
    }
}
