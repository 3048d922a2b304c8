//! Workflow error types for deposit moderation.

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during deposit moderation.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The targeted entry is not a deposit.
    #[error("Entry {0} is not a deposit and cannot be moderated")]
    NotADepositEntry(Uuid),

    /// Rejection reason is required but not provided.
    #[error("Rejection reason is required")]
    RejectionReasonRequired,
}

impl WorkflowError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotADepositEntry(_) | Self::RejectionReasonRequired => 400,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotADepositEntry(_) => "NOT_A_DEPOSIT_ENTRY",
            Self::RejectionReasonRequired => "REJECTION_REASON_REQUIRED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_a_deposit_error() {
        let err = WorkflowError::NotADepositEntry(Uuid::nil());
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "NOT_A_DEPOSIT_ENTRY");
    }

    #[test]
    fn test_rejection_reason_required_error() {
        let err = WorkflowError::RejectionReasonRequired;
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "REJECTION_REASON_REQUIRED");
    }
}
