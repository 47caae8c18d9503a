//! ArtVault Price Oracle
//!
//! USD prices for the ledger currencies. `RateService` is the single entry
//! point used by approvals and minting; oracles behind it are swappable.

mod coingecko;
mod error;
mod fixed;
mod rates;
mod types;

pub use coingecko::{parse_payload, CoinGeckoOracle};
pub use error::OracleError;
pub use fixed::FixedOracle;
pub use rates::{Conversion, RateService, RateSource, RateTable, QUANTITY_SCALE};
pub use types::{Price, PriceOracle};
