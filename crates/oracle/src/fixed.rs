//! Fixed-price oracle
//!
//! Stores prices that can be updated programmatically. Used by tests and by
//! offline deployments.

use artvault_core::Currency;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::error::OracleError;
use crate::types::{Price, PriceOracle};

/// Fixed price oracle
pub struct FixedOracle {
    prices: RwLock<HashMap<Currency, Decimal>>,
    unavailable: AtomicBool,
    requests: AtomicUsize,
}

impl FixedOracle {
    /// Create a new empty oracle
    pub fn new() -> Self {
        Self {
            prices: RwLock::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
        }
    }

    /// Create an oracle quoting the given table
    pub fn with_prices(prices: &BTreeMap<Currency, Decimal>) -> Self {
        let oracle = Self::new();
        for (currency, usd) in prices {
            oracle.set_price(*currency, *usd);
        }
        oracle
    }

    /// Set the USD price of a currency
    pub fn set_price(&self, currency: Currency, usd: Decimal) {
        self.prices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(currency, usd);
    }

    /// Remove a price (the feed then reports it as unknown)
    pub fn remove_price(&self, currency: Currency) {
        self.prices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&currency);
    }

    /// Make every request fail as if the feed were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `get_price`/`get_prices` calls served so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn quote(&self, currency: Currency) -> Result<Price, OracleError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(OracleError::connection(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "fixed oracle marked unavailable",
            )));
        }

        let prices = self.prices.read().unwrap_or_else(PoisonError::into_inner);
        let usd = prices
            .get(&currency)
            .copied()
            .ok_or(OracleError::CurrencyNotFound { currency })?;

        Price::new(currency, usd, "fixed").validate()
    }
}

impl Default for FixedOracle {
    fn default() -> Self {
        Self::with_prices(&artvault_config::default_fallback())
    }
}

#[async_trait]
impl PriceOracle for FixedOracle {
    async fn get_price(&self, currency: &Currency) -> Result<Price, OracleError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.quote(*currency)
    }

    async fn get_prices(
        &self,
        currencies: &[Currency],
    ) -> Result<HashMap<Currency, Price>, OracleError> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        let mut prices = HashMap::new();
        for currency in currencies {
            match self.quote(*currency) {
                Ok(price) => {
                    prices.insert(*currency, price);
                }
                Err(OracleError::CurrencyNotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(prices)
    }

    async fn supported_currencies(&self) -> Vec<Currency> {
        let prices = self.prices.read().unwrap_or_else(PoisonError::into_inner);
        let mut currencies: Vec<Currency> = prices.keys().copied().collect();
        currencies.sort();
        currencies
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_default_prices_match_fallback_table() {
        let oracle = FixedOracle::default();

        let btc = oracle.get_price(&Currency::Btc).await.unwrap();
        assert_eq!(btc.usd, dec!(114500));

        let trx = oracle.get_price(&Currency::Trx).await.unwrap();
        assert_eq!(trx.usd, dec!(0.35));
        assert_eq!(oracle.supported_currencies().await.len(), 5);
    }

    #[tokio::test]
    async fn test_set_and_remove_price() {
        let oracle = FixedOracle::new();
        assert!(oracle.get_price(&Currency::Eth).await.is_err());

        oracle.set_price(Currency::Eth, dec!(4000));
        assert_eq!(oracle.get_price(&Currency::Eth).await.unwrap().usd, dec!(4000));

        oracle.remove_price(Currency::Eth);
        let result = oracle.get_price(&Currency::Eth).await;
        assert!(matches!(result, Err(OracleError::CurrencyNotFound { .. })));
    }

    #[tokio::test]
    async fn test_get_prices_skips_unknown() {
        let oracle = FixedOracle::new();
        oracle.set_price(Currency::Sol, dec!(230));

        let prices = oracle.get_prices(&Currency::ALL).await.unwrap();
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[&Currency::Sol].usd, dec!(230));
        assert_eq!(oracle.request_count(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_fails_every_call() {
        let oracle = FixedOracle::default();
        oracle.set_unavailable(true);

        let result = oracle.get_prices(&Currency::ALL).await;
        assert!(matches!(result, Err(OracleError::ConnectionFailed { .. })));
    }

    #[tokio::test]
    async fn test_zero_price_is_invalid() {
        let oracle = FixedOracle::new();
        oracle.set_price(Currency::Usdt, Decimal::ZERO);

        let result = oracle.get_price(&Currency::Usdt).await;
        assert!(matches!(result, Err(OracleError::InvalidPrice { .. })));
    }
}
