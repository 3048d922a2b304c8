//! Content access grants and the access decision.
//!
//! A grant exists if and only if a committed purchase entry covers it; an
//! active subscription grants blanket access without a per-content record.

pub mod access;
pub mod types;

pub use access::{evaluate_access, AccessDecision, AccessSource};
pub use types::Grant;
