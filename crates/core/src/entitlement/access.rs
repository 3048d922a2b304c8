//! The access decision.
//!
//! `evaluate_access` is a pure read with no side effects: view counters,
//! preview URLs, and any other presentation concerns belong to the callers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::Grant;

/// Why access was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessSource {
    /// A live per-content purchase grant.
    Purchase,
    /// An active subscription window.
    Subscription,
}

/// The outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    /// Whether the account may view the content right now.
    pub granted: bool,
    /// Where the access comes from, when granted.
    pub source: Option<AccessSource>,
}

impl AccessDecision {
    const DENIED: Self = Self {
        granted: false,
        source: None,
    };
}

/// Decides whether an account can access a piece of content at `now`.
///
/// True iff a live purchase grant exists OR the subscription window still
/// covers `now` (expiry is exclusive: at `now == expiry` access is gone).
/// A live grant wins over the subscription so that access survives the
/// subscription lapsing.
#[must_use]
pub fn evaluate_access(
    grant: Option<&Grant>,
    subscription_expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> AccessDecision {
    if grant.is_some_and(Grant::is_live) {
        return AccessDecision {
            granted: true,
            source: Some(AccessSource::Purchase),
        };
    }

    if subscription_expires_at.is_some_and(|expiry| expiry > now) {
        return AccessDecision {
            granted: true,
            source: Some(AccessSource::Subscription),
        };
    }

    AccessDecision::DENIED
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tessera_shared::types::{AccountId, ContentId, EntryId, GrantId};

    fn grant(revoked: bool) -> Grant {
        let now = Utc::now();
        Grant {
            id: GrantId::new(),
            account_id: AccountId::new(),
            content_id: ContentId::from("v1"),
            source_entry_id: EntryId::new(),
            granted_at: now,
            revoked_at: revoked.then_some(now),
            revoked_by_entry_id: None,
        }
    }

    #[test]
    fn test_no_grant_no_subscription_is_denied() {
        let decision = evaluate_access(None, None, Utc::now());
        assert!(!decision.granted);
        assert_eq!(decision.source, None);
    }

    #[test]
    fn test_live_grant_allows_access() {
        let g = grant(false);
        let decision = evaluate_access(Some(&g), None, Utc::now());
        assert!(decision.granted);
        assert_eq!(decision.source, Some(AccessSource::Purchase));
    }

    #[test]
    fn test_revoked_grant_denies_access() {
        let g = grant(true);
        let decision = evaluate_access(Some(&g), None, Utc::now());
        assert!(!decision.granted);
    }

    #[test]
    fn test_active_subscription_allows_access() {
        let now = Utc::now();
        let decision = evaluate_access(None, Some(now + Duration::days(3)), now);
        assert!(decision.granted);
        assert_eq!(decision.source, Some(AccessSource::Subscription));
    }

    #[test]
    fn test_subscription_expiry_is_exclusive() {
        let expiry = Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap();

        // One second before expiry: access.
        let decision = evaluate_access(None, Some(expiry), expiry - Duration::seconds(1));
        assert!(decision.granted);

        // At the expiry instant: no access.
        let decision = evaluate_access(None, Some(expiry), expiry);
        assert!(!decision.granted);

        // After expiry: no access.
        let decision = evaluate_access(None, Some(expiry), expiry + Duration::seconds(1));
        assert!(!decision.granted);
    }

    #[test]
    fn test_purchase_grant_outlives_lapsed_subscription() {
        let now = Utc::now();
        let g = grant(false);
        let decision = evaluate_access(Some(&g), Some(now - Duration::days(1)), now);
        assert!(decision.granted);
        assert_eq!(decision.source, Some(AccessSource::Purchase));
    }

    #[test]
    fn test_revoked_grant_falls_back_to_subscription() {
        let now = Utc::now();
        let g = grant(true);
        let decision = evaluate_access(Some(&g), Some(now + Duration::days(1)), now);
        assert!(decision.granted);
        assert_eq!(decision.source, Some(AccessSource::Subscription));
    }
}
