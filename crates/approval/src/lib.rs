//! # ArtVault Approval Module
//!
//! Deposit and withdrawal requests and their admin approval.
//!
//! ## Lifecycle
//! - Submitted transactions start `Processing`
//! - `Processing -> Approved` moves funds, `Processing -> Failed` does not
//! - Pending withdrawals hold their crypto quantity until decided
//!
//! ## Guarantees
//! - Status check and ledger change share one database transaction
//! - Prices are resolved before the database lock is taken
//! - Balance events are appended to the outbox and published after commit

mod error;
mod workflow;

pub use error::{ApprovalError, ApprovalResult};
pub use workflow::{Approval, ApprovalWorkflow};
