//! Approval workflow errors

use artvault_bus::BusError;
use artvault_core::Currency;
use artvault_ledger::LedgerError;
use artvault_oracle::OracleError;
use artvault_store::StoreError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors from the approval workflow
#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("Invalid transaction {id}: {reason}")]
    InvalidTransaction { id: String, reason: String },

    #[error("Insufficient balance: ${requested_usd} requested, ${available_usd} available in {currency}")]
    InsufficientBalance {
        currency: Currency,
        requested_usd: Decimal,
        available_usd: Decimal,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error(transparent)]
    Oracle(#[from] OracleError),
}

impl ApprovalError {
    pub(crate) fn invalid(id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidTransaction {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<rusqlite::Error> for ApprovalError {
    fn from(err: rusqlite::Error) -> Self {
        ApprovalError::Store(StoreError::from(err))
    }
}

pub type ApprovalResult<T> = Result<T, ApprovalError>;
