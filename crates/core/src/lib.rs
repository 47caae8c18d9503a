//! ArtVault Core - Domain types
//!
//! This crate contains the fundamental types used across ArtVault:
//! - `Amount`: Non-negative decimal wrapper for balances and USD values
//! - `Currency`: Supported ledger currencies with alias normalisation
//! - `Role`, `TransactionType`, `TransactionStatus`: persisted enums
//! - `ListedPrice`: `"<amount> <SYMBOL>"` artwork prices

pub mod amount;
pub mod currency;
pub mod kinds;
pub mod price;

pub use amount::{Amount, AmountError};
pub use currency::{Currency, CurrencyError};
pub use kinds::{Role, TransactionStatus, TransactionType};
pub use price::{ListedPrice, PriceError};
