//! Configuration types

use artvault_core::Currency;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Price feed and rate cache
    #[serde(default)]
    pub rates: RatesConfig,

    /// Marketplace fees
    #[serde(default)]
    pub fees: FeesConfig,

    /// Credential policy
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging
    #[serde(default)]
    pub log: LogConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/artvault.db")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Price feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatesConfig {
    /// CoinGecko-compatible simple-price endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// How long a fetched rate table stays fresh
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Outbound request timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Skip the network entirely and always use the fallback table
    #[serde(default)]
    pub offline: bool,

    /// USD prices used when the feed is unavailable
    #[serde(default = "default_fallback")]
    pub fallback: BTreeMap<Currency, Decimal>,
}

fn default_endpoint() -> String {
    "https://api.coingecko.com/api/v3/simple/price".to_string()
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_request_timeout() -> u64 {
    10
}

/// The single fallback rate table
pub fn default_fallback() -> BTreeMap<Currency, Decimal> {
    BTreeMap::from([
        (Currency::Eth, Decimal::new(4500, 0)),
        (Currency::Sol, Decimal::new(230, 0)),
        (Currency::Btc, Decimal::new(114_500, 0)),
        (Currency::Usdt, Decimal::ONE),
        (Currency::Trx, Decimal::new(35, 2)),
    ])
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            cache_ttl_secs: default_cache_ttl(),
            request_timeout_secs: default_request_timeout(),
            offline: false,
            fallback: default_fallback(),
        }
    }
}

/// Fee configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeesConfig {
    /// Share of the USD price charged as gas when minting
    #[serde(default = "default_gas_fee_rate")]
    pub gas_fee_rate: Decimal,
}

fn default_gas_fee_rate() -> Decimal {
    Decimal::new(1, 1)
}

impl Default for FeesConfig {
    fn default() -> Self {
        Self {
            gas_fee_rate: default_gas_fee_rate(),
        }
    }
}

/// Credential policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Minimum password length accepted at signup
    #[serde(default = "default_min_password_len")]
    pub min_password_len: usize,

    /// SHA-256 rounds applied to salted passwords
    #[serde(default = "default_hash_iterations")]
    pub hash_iterations: u32,
}

fn default_min_password_len() -> usize {
    6
}

fn default_hash_iterations() -> u32 {
    10_000
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            min_password_len: default_min_password_len(),
            hash_iterations: default_hash_iterations(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
