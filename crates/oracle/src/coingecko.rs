//! CoinGecko simple-price feed
//!
//! One request per refresh:
//! `GET <endpoint>?ids=tether,ethereum,bitcoin,solana,tron&vs_currencies=usd`
//! answering `{"bitcoin": {"usd": 114500.0}, ...}`.

use artvault_core::Currency;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::error::OracleError;
use crate::types::{Price, PriceOracle};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Live price feed backed by the CoinGecko simple-price API
pub struct CoinGeckoOracle {
    http: reqwest::Client,
    endpoint: String,
}

impl CoinGeckoOracle {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, OracleError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .pool_max_idle_per_host(2)
            .build()
            .map_err(OracleError::connection)?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    async fn fetch(&self, currencies: &[Currency]) -> Result<Value, OracleError> {
        let ids: Vec<&str> = currencies.iter().map(|c| c.coingecko_id()).collect();
        let ids = ids.join(",");

        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("ids", ids.as_str()), ("vs_currencies", "usd")])
            .send()
            .await
            .map_err(OracleError::connection)?;

        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| OracleError::MalformedPayload(e.to_string()))?;

        debug!(ids = %ids, "Fetched prices from CoinGecko");
        Ok(body)
    }
}

/// Extract the USD prices of `currencies` from a simple-price payload
///
/// Currencies missing from the payload are left out of the result. A payload
/// that is not an object, or an entry whose `usd` is not a positive number,
/// is an error.
pub fn parse_payload(
    body: &Value,
    currencies: &[Currency],
) -> Result<HashMap<Currency, Price>, OracleError> {
    let object = body
        .as_object()
        .ok_or_else(|| OracleError::MalformedPayload(format!("expected object, got {body}")))?;

    let mut prices = HashMap::new();
    for currency in currencies {
        let Some(entry) = object.get(currency.coingecko_id()) else {
            continue;
        };

        let usd = entry
            .get("usd")
            .and_then(Value::as_number)
            .ok_or_else(|| OracleError::InvalidPrice {
                currency: *currency,
                reason: format!("missing numeric usd field in {entry}"),
            })?;

        let text = usd.to_string();
        let usd = Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .map_err(|_| OracleError::InvalidPrice {
                currency: *currency,
                reason: format!("unreadable number {text}"),
            })?;

        prices.insert(*currency, Price::new(*currency, usd, "coingecko").validate()?);
    }

    Ok(prices)
}

#[async_trait]
impl PriceOracle for CoinGeckoOracle {
    async fn get_price(&self, currency: &Currency) -> Result<Price, OracleError> {
        let body = self.fetch(std::slice::from_ref(currency)).await?;
        parse_payload(&body, std::slice::from_ref(currency))?
            .remove(currency)
            .ok_or(OracleError::CurrencyNotFound {
                currency: *currency,
            })
    }

    async fn get_prices(
        &self,
        currencies: &[Currency],
    ) -> Result<HashMap<Currency, Price>, OracleError> {
        let body = self.fetch(currencies).await?;
        parse_payload(&body, currencies)
    }

    async fn supported_currencies(&self) -> Vec<Currency> {
        Currency::ALL.to_vec()
    }

    fn name(&self) -> &str {
        "coingecko"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_parse_full_payload() {
        let body = json!({
            "bitcoin": {"usd": 114500},
            "ethereum": {"usd": 4500.25},
            "solana": {"usd": 230},
            "tether": {"usd": 1.0},
            "tron": {"usd": 0.35}
        });

        let prices = parse_payload(&body, &Currency::ALL).unwrap();
        assert_eq!(prices.len(), 5);
        assert_eq!(prices[&Currency::Btc].usd, dec!(114500));
        assert_eq!(prices[&Currency::Eth].usd, dec!(4500.25));
        assert_eq!(prices[&Currency::Trx].usd, dec!(0.35));
        assert_eq!(prices[&Currency::Usdt].source, "coingecko");
    }

    #[test]
    fn test_missing_symbol_left_out() {
        let body = json!({"bitcoin": {"usd": 100000}});
        let prices = parse_payload(&body, &[Currency::Btc, Currency::Sol]).unwrap();

        assert_eq!(prices.len(), 1);
        assert!(!prices.contains_key(&Currency::Sol));
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(matches!(
            parse_payload(&json!(["bitcoin"]), &Currency::ALL),
            Err(OracleError::MalformedPayload(_))
        ));
        assert!(matches!(
            parse_payload(&json!({"bitcoin": {"usd": "lots"}}), &[Currency::Btc]),
            Err(OracleError::InvalidPrice { .. })
        ));
        assert!(matches!(
            parse_payload(&json!({"solana": {"usd": 0}}), &[Currency::Sol]),
            Err(OracleError::InvalidPrice { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_connection_error() {
        let oracle =
            CoinGeckoOracle::new("http://127.0.0.1:9/simple/price", Duration::from_millis(200))
                .unwrap();

        let result = oracle.get_prices(&Currency::ALL).await;
        assert!(matches!(result, Err(OracleError::ConnectionFailed { .. })));
    }
}
