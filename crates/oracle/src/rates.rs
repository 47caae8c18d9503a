//! Rate service
//!
//! The one place USD prices are resolved. Wraps a [`PriceOracle`] with a
//! TTL cache and a single fallback table, and does USD/crypto conversion.

use artvault_config::RatesConfig;
use artvault_core::{Amount, Currency};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use strum_macros::Display;
use tracing::{debug, warn};

use crate::coingecko::CoinGeckoOracle;
use crate::error::OracleError;
use crate::types::PriceOracle;

/// Decimal places kept on converted crypto quantities
pub const QUANTITY_SCALE: u32 = 18;

/// Where the prices of a [`RateTable`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum RateSource {
    /// Every price from the live feed
    Live,
    /// Live feed, with missing symbols filled from the fallback table
    Partial,
    /// The fallback table only
    Fallback,
}

/// USD price of every supported currency at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTable {
    pub prices: BTreeMap<Currency, Decimal>,
    pub source: RateSource,
    pub fetched_at: DateTime<Utc>,
}

/// Result of a USD to crypto conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    pub currency: Currency,
    pub usd: Amount,
    pub quantity: Amount,
    /// USD price of one unit used for the conversion
    pub rate: Decimal,
}

impl RateTable {
    fn fallback(table: &BTreeMap<Currency, Decimal>) -> Self {
        Self {
            prices: table.clone(),
            source: RateSource::Fallback,
            fetched_at: Utc::now(),
        }
    }

    /// USD price of one unit of `currency`
    pub fn rate(&self, currency: Currency) -> Result<Decimal, OracleError> {
        self.prices
            .get(&currency)
            .copied()
            .filter(|rate| *rate > Decimal::ZERO)
            .ok_or(OracleError::CurrencyNotFound { currency })
    }

    /// Convert a USD amount to a quantity of `currency`
    pub fn usd_to_crypto(&self, usd: Amount, currency: Currency) -> Result<Conversion, OracleError> {
        let rate = self.rate(currency)?;
        let quantity = usd
            .value()
            .checked_div(rate)
            .ok_or_else(|| OracleError::InvalidPrice {
                currency,
                reason: format!("cannot divide {usd} by {rate}"),
            })?
            .round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::MidpointNearestEven);

        Ok(Conversion {
            currency,
            usd,
            quantity: Amount::clamped(quantity),
            rate,
        })
    }

    /// USD value of a quantity of `currency`
    pub fn crypto_to_usd(&self, quantity: Amount, currency: Currency) -> Result<Amount, OracleError> {
        let rate = self.rate(currency)?;
        let usd = quantity
            .value()
            .checked_mul(rate)
            .ok_or_else(|| OracleError::InvalidPrice {
                currency,
                reason: format!("overflow valuing {quantity} at {rate}"),
            })?;
        Ok(Amount::clamped(usd))
    }
}

struct CachedTable {
    table: RateTable,
    stored_at: Instant,
}

/// Shared, cached rate resolution
pub struct RateService {
    oracle: Option<Arc<dyn PriceOracle>>,
    fallback: BTreeMap<Currency, Decimal>,
    ttl: Duration,
    cache: Mutex<Option<CachedTable>>,
}

impl RateService {
    pub fn new(
        oracle: Arc<dyn PriceOracle>,
        fallback: BTreeMap<Currency, Decimal>,
        ttl: Duration,
    ) -> Self {
        Self {
            oracle: Some(oracle),
            fallback,
            ttl,
            cache: Mutex::new(None),
        }
    }

    /// A service that never touches the network
    pub fn offline(fallback: BTreeMap<Currency, Decimal>) -> Self {
        Self {
            oracle: None,
            fallback,
            ttl: Duration::ZERO,
            cache: Mutex::new(None),
        }
    }

    /// Build the service described by the `[rates]` config section
    pub fn from_config(config: &RatesConfig) -> Result<Self, OracleError> {
        if config.offline {
            return Ok(Self::offline(config.fallback.clone()));
        }

        let oracle = CoinGeckoOracle::new(
            config.endpoint.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )?;
        Ok(Self::new(
            Arc::new(oracle),
            config.fallback.clone(),
            Duration::from_secs(config.cache_ttl_secs),
        ))
    }

    /// The documented fallback table
    pub fn fallback_table(&self) -> RateTable {
        RateTable::fallback(&self.fallback)
    }

    fn cached(&self) -> Option<RateTable> {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache
            .as_ref()
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.table.clone())
    }

    /// Current rate table
    ///
    /// Served from cache while fresh. A failed or empty fetch logs a warning
    /// and yields the fallback table, which is not cached.
    pub async fn rates(&self) -> RateTable {
        let Some(oracle) = &self.oracle else {
            return self.fallback_table();
        };

        if let Some(table) = self.cached() {
            debug!(source = %table.source, "Rate cache hit");
            return table;
        }

        let fetched = match oracle.get_prices(&Currency::ALL).await {
            Ok(prices) if !prices.is_empty() => prices,
            Ok(_) => {
                warn!(oracle = oracle.name(), "Price feed returned no prices, using fallback rates");
                return self.fallback_table();
            }
            Err(e) => {
                warn!(oracle = oracle.name(), error = %e, "Price feed unavailable, using fallback rates");
                return self.fallback_table();
            }
        };

        let mut prices = self.fallback.clone();
        let mut source = RateSource::Live;
        for currency in Currency::ALL {
            match fetched.get(&currency) {
                Some(price) => {
                    prices.insert(currency, price.usd);
                }
                None => {
                    debug!(%currency, "Missing from feed, using fallback rate");
                    source = RateSource::Partial;
                }
            }
        }

        let table = RateTable {
            prices,
            source,
            fetched_at: Utc::now(),
        };

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        *cache = Some(CachedTable {
            table: table.clone(),
            stored_at: Instant::now(),
        });

        table
    }

    /// Current USD price of one currency
    pub async fn rate(&self, currency: Currency) -> Result<Decimal, OracleError> {
        self.rates().await.rate(currency)
    }

    pub async fn usd_to_crypto(
        &self,
        usd: Amount,
        currency: Currency,
    ) -> Result<Conversion, OracleError> {
        self.rates().await.usd_to_crypto(usd, currency)
    }

    pub async fn crypto_to_usd(
        &self,
        quantity: Amount,
        currency: Currency,
    ) -> Result<Amount, OracleError> {
        self.rates().await.crypto_to_usd(quantity, currency)
    }

    /// Drop the cached table so the next call refetches
    pub fn invalidate(&self) {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        *cache = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::FixedOracle;
    use artvault_config::default_fallback;
    use rust_decimal_macros::dec;

    fn service(oracle: Arc<FixedOracle>, ttl: Duration) -> RateService {
        RateService::new(oracle, default_fallback(), ttl)
    }

    #[tokio::test]
    async fn test_live_table_is_cached_for_ttl() {
        let oracle = Arc::new(FixedOracle::default());
        let rates = service(oracle.clone(), Duration::from_secs(300));

        let first = rates.rates().await;
        oracle.set_price(Currency::Eth, dec!(1));
        let second = rates.rates().await;

        assert_eq!(first.source, RateSource::Live);
        assert_eq!(second.prices[&Currency::Eth], dec!(4500));
        assert_eq!(oracle.request_count(), 1);

        rates.invalidate();
        assert_eq!(rates.rate(Currency::Eth).await.unwrap(), dec!(1));
        assert_eq!(oracle.request_count(), 2);
    }

    #[tokio::test]
    async fn test_zero_ttl_always_refetches() {
        let oracle = Arc::new(FixedOracle::default());
        let rates = service(oracle.clone(), Duration::ZERO);

        rates.rates().await;
        rates.rates().await;
        assert_eq!(oracle.request_count(), 2);
    }

    #[tokio::test]
    async fn test_feed_failure_uses_fallback_and_is_not_cached() {
        let oracle = Arc::new(FixedOracle::default());
        oracle.set_price(Currency::Btc, dec!(90000));
        oracle.set_unavailable(true);
        let rates = service(oracle.clone(), Duration::from_secs(300));

        let table = rates.rates().await;
        assert_eq!(table.source, RateSource::Fallback);
        assert_eq!(table.prices[&Currency::Btc], dec!(114500));

        oracle.set_unavailable(false);
        let table = rates.rates().await;
        assert_eq!(table.source, RateSource::Live);
        assert_eq!(table.prices[&Currency::Btc], dec!(90000));
    }

    #[tokio::test]
    async fn test_missing_symbols_filled_from_fallback() {
        let oracle = Arc::new(FixedOracle::new());
        oracle.set_price(Currency::Eth, dec!(4000));
        let rates = service(oracle, Duration::from_secs(300));

        let table = rates.rates().await;
        assert_eq!(table.source, RateSource::Partial);
        assert_eq!(table.prices[&Currency::Eth], dec!(4000));
        assert_eq!(table.prices[&Currency::Sol], dec!(230));
        assert_eq!(table.prices.len(), Currency::ALL.len());
    }

    #[tokio::test]
    async fn test_offline_service() {
        let rates = RateService::offline(default_fallback());
        let table = rates.rates().await;
        assert_eq!(table.source, RateSource::Fallback);
        assert_eq!(table.prices[&Currency::Usdt], dec!(1));
    }

    #[test]
    fn test_conversions() {
        let table = RateTable::fallback(&default_fallback());

        let eth = table
            .usd_to_crypto(Amount::new(dec!(100)).unwrap(), Currency::Eth)
            .unwrap();
        assert_eq!(eth.rate, dec!(4500));
        assert_eq!(eth.quantity.value().round_dp(6), dec!(0.022222));

        let btc = table
            .usd_to_crypto(Amount::new(dec!(500)).unwrap(), Currency::Btc)
            .unwrap();
        assert_eq!(btc.quantity.value().round_dp(6), dec!(0.004367));

        let usd = table
            .crypto_to_usd(Amount::new(dec!(0.01)).unwrap(), Currency::Btc)
            .unwrap();
        assert_eq!(usd.value(), dec!(1145));
    }
}
