//! ArtVault Ledger - Per-owner multi-currency balances
//!
//! All balance changes go through this crate.
//!
//! # Key Types
//! - `Ledger`: balance reads, credits, clamped debits and holds
//! - `Hold`: funds reserved for a pending withdrawal
//! - `Debit`: what a clamped debit actually took

pub mod balance;
pub mod error;
pub mod hold;

pub use balance::{Balances, Debit, Ledger};
pub use error::{LedgerError, LedgerResult};
pub use hold::Hold;
