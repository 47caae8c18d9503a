//! Currency - Supported ledger currencies
//!
//! Every balance, hold and transaction is keyed by one of these symbols.
//! Parsing normalises network-suffixed aliases (`USDT_TRC20`) onto the base
//! symbol so they share a ledger key.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when parsing currencies
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CurrencyError {
    #[error("Empty currency code")]
    EmptyCode,

    #[error("Unsupported currency: {0}")]
    Unsupported(String),
}

/// Currencies held in user ledgers
///
/// # Examples
/// ```
/// use artvault_core::Currency;
///
/// let usdt: Currency = "USDT_TRC20".parse().unwrap();
/// assert_eq!(usdt, Currency::Usdt);
///
/// let btc: Currency = "btc".parse().unwrap();
/// assert_eq!(btc.to_string(), "BTC");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Currency {
    /// Tether USD
    Usdt,
    /// Ethereum
    Eth,
    /// Bitcoin
    Btc,
    /// Solana
    Sol,
    /// Tron
    Trx,
}

impl Currency {
    /// All supported currencies, in display order
    pub const ALL: [Currency; 5] = [
        Currency::Usdt,
        Currency::Eth,
        Currency::Btc,
        Currency::Sol,
        Currency::Trx,
    ];

    /// Returns the currency code as a string slice
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usdt => "USDT",
            Currency::Eth => "ETH",
            Currency::Btc => "BTC",
            Currency::Sol => "SOL",
            Currency::Trx => "TRX",
        }
    }

    /// Identifier used by the CoinGecko simple-price API
    pub fn coingecko_id(&self) -> &'static str {
        match self {
            Currency::Usdt => "tether",
            Currency::Eth => "ethereum",
            Currency::Btc => "bitcoin",
            Currency::Sol => "solana",
            Currency::Trx => "tron",
        }
    }

    /// Returns true if this is a USD stablecoin
    pub fn is_stablecoin(&self) -> bool {
        matches!(self, Currency::Usdt)
    }

    /// Number of decimals used when rendering a listed price
    pub fn display_decimals(&self) -> u32 {
        if self.is_stablecoin() {
            0
        } else {
            6
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_uppercase();

        if s.is_empty() {
            return Err(CurrencyError::EmptyCode);
        }

        Ok(match s.as_str() {
            "USDT" | "USDT_TRC20" => Currency::Usdt,
            "ETH" => Currency::Eth,
            "BTC" => Currency::Btc,
            "SOL" => Currency::Sol,
            "TRX" => Currency::Trx,
            _ => return Err(CurrencyError::Unsupported(s)),
        })
    }
}

impl TryFrom<String> for Currency {
    type Error = CurrencyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Currency> for String {
    fn from(c: Currency) -> Self {
        c.code().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_currencies() {
        assert_eq!("USDT".parse::<Currency>().unwrap(), Currency::Usdt);
        assert_eq!("btc".parse::<Currency>().unwrap(), Currency::Btc);
        assert_eq!("ETH".parse::<Currency>().unwrap(), Currency::Eth);
        assert_eq!(" sol ".parse::<Currency>().unwrap(), Currency::Sol);
        assert_eq!("TRX".parse::<Currency>().unwrap(), Currency::Trx);
    }

    #[test]
    fn test_trc20_alias_normalises_to_usdt() {
        let alias: Currency = "USDT_TRC20".parse().unwrap();
        let base: Currency = "USDT".parse().unwrap();
        assert_eq!(alias, base);
        assert_eq!(alias.code(), "USDT");
    }

    #[test]
    fn test_normalisation_is_idempotent() {
        let once: Currency = "usdt_trc20".parse().unwrap();
        let twice: Currency = once.code().parse().unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unsupported_rejected() {
        let result: Result<Currency, _> = "DOGE".parse();
        assert!(matches!(result, Err(CurrencyError::Unsupported(_))));
    }

    #[test]
    fn test_empty_code_error() {
        let result: Result<Currency, _> = "  ".parse();
        assert!(matches!(result, Err(CurrencyError::EmptyCode)));
    }

    #[test]
    fn test_coingecko_ids() {
        let ids: Vec<&str> = Currency::ALL.iter().map(|c| c.coingecko_id()).collect();
        assert_eq!(ids, vec!["tether", "ethereum", "bitcoin", "solana", "tron"]);
    }

    #[test]
    fn test_serde_accepts_alias() {
        let parsed: Currency = serde_json::from_str("\"USDT_TRC20\"").unwrap();
        assert_eq!(parsed, Currency::Usdt);
        assert_eq!(serde_json::to_string(&Currency::Sol).unwrap(), "\"SOL\"");
    }
}
