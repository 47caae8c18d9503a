//! Oracle error types

use artvault_core::Currency;
use thiserror::Error;

/// Oracle-related errors
#[derive(Debug, Error)]
pub enum OracleError {
    /// The feed has no price for this currency
    #[error("No price for {currency}")]
    CurrencyNotFound { currency: Currency },

    /// Price data is invalid
    #[error("Invalid price for {currency}: {reason}")]
    InvalidPrice { currency: Currency, reason: String },

    /// The feed answered with something we cannot read
    #[error("Malformed price payload: {0}")]
    MalformedPayload(String),

    /// The feed answered with a non-success status
    #[error("Price feed returned HTTP {status}")]
    HttpStatus { status: u16 },

    /// External oracle connection failed
    #[error("Oracle connection failed: {source}")]
    ConnectionFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl OracleError {
    pub fn connection(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::ConnectionFailed {
            source: Box::new(source),
        }
    }
}
