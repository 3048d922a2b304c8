//! Ledger error types for validation and state errors.
//!
//! All ledger operations return typed results; none of these errors may
//! leave an account partially updated.

use thiserror::Error;
use uuid::Uuid;

use super::types::EntryStatus;
use crate::workflow::WorkflowError;
use tessera_shared::types::{Currency, Money, MoneyError};

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Amount must be strictly positive for this operation.
    #[error("Amount must be positive, got {0} minor units")]
    InvalidAmount(i64),

    /// Operands carry different currencies.
    #[error("Currency mismatch: {left} vs {right}")]
    CurrencyMismatch {
        /// Currency of the left operand.
        left: Currency,
        /// Currency of the right operand.
        right: Currency,
    },

    /// Amount magnitude exceeds the representable ceiling.
    #[error("Arithmetic overflow in balance calculation")]
    ArithmeticOverflow,

    /// Subscription duration must cover at least one day.
    #[error("Subscription duration must be at least 1 day, got {0}")]
    InvalidDuration(u32),

    // ========== Balance Errors ==========
    /// The available balance does not cover the debit.
    #[error("Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance {
        /// The amount the operation requires.
        needed: Money,
        /// The spendable balance at the time of the check.
        available: Money,
    },

    // ========== Entry State Errors ==========
    /// The entry has already been resolved to a conflicting terminal state.
    #[error("Entry {entry_id} is not pending (status: {status})")]
    EntryNotPending {
        /// The entry ID.
        entry_id: Uuid,
        /// The entry's current status.
        status: EntryStatus,
    },

    /// The entry cannot be reversed (pending, already reversed, or of a
    /// non-reversible kind).
    #[error("Entry {0} is not reversible")]
    EntryNotReversible(Uuid),

    // ========== Lookup Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    /// Entry not found.
    #[error("Ledger entry not found: {0}")]
    EntryNotFound(Uuid),

    // ========== Workflow Errors ==========
    /// Deposit moderation rejected by the approval workflow.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    // ========== Concurrency Errors ==========
    /// A single optimistic-lock attempt lost the race; retryable.
    #[error("Concurrent modification on account {0}, please retry")]
    ConcurrentModification(Uuid),

    /// The retry budget for an operation is exhausted.
    #[error("Account {account_id} is busy after {attempts} attempts")]
    Busy {
        /// The contended account.
        account_id: Uuid,
        /// How many attempts were made.
        attempts: u32,
    },

    // ========== Database Errors ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<MoneyError> for LedgerError {
    fn from(err: MoneyError) -> Self {
        match err {
            MoneyError::CurrencyMismatch { left, right } => {
                Self::CurrencyMismatch { left, right }
            }
            MoneyError::ArithmeticOverflow => Self::ArithmeticOverflow,
        }
    }
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InvalidDuration(_) => "INVALID_DURATION",
            Self::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            Self::ArithmeticOverflow => "ARITHMETIC_OVERFLOW",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::EntryNotPending { .. } => "ENTRY_NOT_PENDING",
            Self::EntryNotReversible(_) => "ENTRY_NOT_REVERSIBLE",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::Workflow(err) => err.error_code(),
            Self::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            Self::Busy { .. } => "BUSY",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InvalidAmount(_)
            | Self::InvalidDuration(_)
            | Self::CurrencyMismatch { .. }
            | Self::ArithmeticOverflow => 400,

            // 404 Not Found
            Self::AccountNotFound(_) | Self::EntryNotFound(_) => 404,

            // 409 Conflict - state and concurrency errors
            Self::EntryNotPending { .. }
            | Self::EntryNotReversible(_)
            | Self::ConcurrentModification(_) => 409,

            // 422 Unprocessable - business rule failures
            Self::InsufficientBalance { .. } => 422,

            // 503 - contention, caller should back off and retry
            Self::Busy { .. } => 503,

            Self::Workflow(err) => err.status_code(),

            // 500 Internal Server Error
            Self::Database(_) => 500,
        }
    }

    /// Returns true if the caller may retry the operation with backoff.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification(_) | Self::Busy { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_shared::types::Currency;

    #[test]
    fn test_error_codes() {
        assert_eq!(LedgerError::InvalidAmount(0).error_code(), "INVALID_AMOUNT");
        assert_eq!(
            LedgerError::InsufficientBalance {
                needed: Money::from_minor(500, Currency::Usd),
                available: Money::from_minor(100, Currency::Usd),
            }
            .error_code(),
            "INSUFFICIENT_BALANCE"
        );
        assert_eq!(
            LedgerError::EntryNotPending {
                entry_id: Uuid::nil(),
                status: EntryStatus::Rejected,
            }
            .error_code(),
            "ENTRY_NOT_PENDING"
        );
        assert_eq!(
            LedgerError::EntryNotReversible(Uuid::nil()).error_code(),
            "ENTRY_NOT_REVERSIBLE"
        );
        assert_eq!(
            LedgerError::Busy {
                account_id: Uuid::nil(),
                attempts: 5,
            }
            .error_code(),
            "BUSY"
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(LedgerError::InvalidAmount(-5).http_status_code(), 400);
        assert_eq!(
            LedgerError::AccountNotFound(Uuid::nil()).http_status_code(),
            404
        );
        assert_eq!(
            LedgerError::ConcurrentModification(Uuid::nil()).http_status_code(),
            409
        );
        assert_eq!(
            LedgerError::InsufficientBalance {
                needed: Money::from_minor(500, Currency::Usd),
                available: Money::from_minor(100, Currency::Usd),
            }
            .http_status_code(),
            422
        );
        assert_eq!(
            LedgerError::Busy {
                account_id: Uuid::nil(),
                attempts: 5,
            }
            .http_status_code(),
            503
        );
        assert_eq!(
            LedgerError::Database("boom".to_string()).http_status_code(),
            500
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(LedgerError::ConcurrentModification(Uuid::nil()).is_retryable());
        assert!(LedgerError::Busy {
            account_id: Uuid::nil(),
            attempts: 3,
        }
        .is_retryable());
        assert!(!LedgerError::InvalidAmount(0).is_retryable());
        assert!(!LedgerError::EntryNotReversible(Uuid::nil()).is_retryable());
    }

    #[test]
    fn test_money_error_conversion() {
        let err: LedgerError = MoneyError::ArithmeticOverflow.into();
        assert!(matches!(err, LedgerError::ArithmeticOverflow));

        let err: LedgerError = MoneyError::CurrencyMismatch {
            left: Currency::Usd,
            right: Currency::Jpy,
        }
        .into();
        assert_eq!(err.error_code(), "CURRENCY_MISMATCH");
    }

    #[test]
    fn test_insufficient_balance_display() {
        let err = LedgerError::InsufficientBalance {
            needed: Money::from_minor(100_000, Currency::Usd),
            available: Money::from_minor(50_000, Currency::Usd),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient balance: need 1000.00 USD, have 500.00 USD"
        );
    }
}
