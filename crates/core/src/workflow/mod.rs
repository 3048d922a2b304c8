//! Deposit approval workflow.
//!
//! A moderator (admin UI button or chat-bot callback, both external) resolves
//! pending deposits. The workflow validates that the action is addressed at a
//! pending deposit entry and delegates the balance effect to the ledger; it
//! never touches balances itself.

pub mod error;
pub mod service;
pub mod types;

pub use error::WorkflowError;
pub use service::ApprovalWorkflow;
pub use types::{DepositDecision, DepositTransition, ModeratorAction};
