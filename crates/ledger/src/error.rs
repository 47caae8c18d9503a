//! Ledger errors

use artvault_core::Currency;
use artvault_store::StoreError;
use thiserror::Error;

/// Errors that can occur in ledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Ledger owner cannot be empty")]
    EmptyOwner,

    #[error("Balance overflow for {owner} in {currency}")]
    Overflow { owner: String, currency: Currency },

    #[error("A hold already exists for transaction {0}")]
    DuplicateHold(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        LedgerError::Store(StoreError::from(err))
    }
}

/// Result type alias for LedgerError
pub type LedgerResult<T> = Result<T, LedgerError>;
