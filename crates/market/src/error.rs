//! Market errors

use artvault_bus::BusError;
use artvault_core::Currency;
use artvault_ledger::LedgerError;
use artvault_oracle::OracleError;
use artvault_store::StoreError;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("Artwork not found: {0}")]
    NotFound(String),

    #[error("Invalid transaction for artwork {id}: {reason}")]
    InvalidTransaction { id: String, reason: String },

    #[error("Insufficient balance: gas fee is {required} {currency}, {available} available")]
    InsufficientBalance {
        currency: Currency,
        required: Decimal,
        available: Decimal,
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

impl From<rusqlite::Error> for MarketError {
    fn from(err: rusqlite::Error) -> Self {
        MarketError::Store(StoreError::from(err))
    }
}

pub type MarketResult<T> = Result<T, MarketError>;
