//! Core oracle types

use artvault_core::Currency;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::OracleError;

/// A USD price quote for one currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub currency: Currency,
    /// Price of one unit in USD
    pub usd: Decimal,
    /// Timestamp when this price was fetched
    pub timestamp: DateTime<Utc>,
    /// Source of the price (e.g., "fixed", "coingecko")
    pub source: String,
}

impl Price {
    pub fn new(currency: Currency, usd: Decimal, source: impl Into<String>) -> Self {
        Self {
            currency,
            usd,
            timestamp: Utc::now(),
            source: source.into(),
        }
    }

    /// Check if price is stale (older than threshold)
    pub fn is_stale(&self, max_age_secs: u64) -> bool {
        let age = Utc::now().signed_duration_since(self.timestamp);
        age.num_seconds() > max_age_secs as i64
    }

    /// Reject zero or negative quotes
    pub fn validate(self) -> Result<Self, OracleError> {
        if self.usd <= Decimal::ZERO {
            return Err(OracleError::InvalidPrice {
                currency: self.currency,
                reason: format!("non-positive price {}", self.usd),
            });
        }
        Ok(self)
    }
}

/// Price Oracle trait - interface for price feeds
///
/// Implementations:
/// - `FixedOracle`: programmable prices for tests and offline use
/// - `CoinGeckoOracle`: the public simple-price API
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Get the current USD price of a currency
    async fn get_price(&self, currency: &Currency) -> Result<Price, OracleError>;

    /// Get prices for several currencies at once
    ///
    /// Currencies the feed does not know are left out of the map; any other
    /// failure fails the whole call.
    async fn get_prices(
        &self,
        currencies: &[Currency],
    ) -> Result<HashMap<Currency, Price>, OracleError> {
        let mut prices = HashMap::new();
        for currency in currencies {
            match self.get_price(currency).await {
                Ok(price) => {
                    prices.insert(*currency, price);
                }
                Err(OracleError::CurrencyNotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(prices)
    }

    /// Get a list of all supported currencies
    async fn supported_currencies(&self) -> Vec<Currency>;

    /// Check if a currency is supported
    async fn is_supported(&self, currency: &Currency) -> bool {
        self.supported_currencies().await.contains(currency)
    }

    /// Short name used in logs and rate tables
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_rejects_non_positive() {
        assert!(Price::new(Currency::Eth, dec!(4500), "test").validate().is_ok());
        assert!(matches!(
            Price::new(Currency::Eth, Decimal::ZERO, "test").validate(),
            Err(OracleError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn test_fresh_price_not_stale() {
        let price = Price::new(Currency::Sol, dec!(230), "test");
        assert!(!price.is_stale(60));
    }
}
