//! Configuration loader

use artvault_core::Currency;
use rust_decimal::Decimal;
use std::path::Path;
use thiserror::Error;

use crate::types::{default_fallback, AppConfig};

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found
    #[error("config file not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Validation error
    #[error("validation error: {0}")]
    Validation(String),
}

/// Loads and validates [`AppConfig`]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<AppConfig, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::load_str(&content)?;

        tracing::debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load configuration from file, or fall back to defaults when the file
    /// does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<AppConfig, ConfigError> {
        match Self::load_file(path) {
            Err(ConfigError::NotFound(path)) => {
                tracing::debug!(%path, "No config file, using defaults");
                Ok(AppConfig::default())
            }
            other => other,
        }
    }

    /// Load configuration from string
    pub fn load_str(content: &str) -> Result<AppConfig, ConfigError> {
        let mut config: AppConfig = toml::from_str(content)?;

        // A partial fallback table only overrides the symbols it names
        for (currency, price) in default_fallback() {
            config.rates.fallback.entry(currency).or_insert(price);
        }

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
        for currency in Currency::ALL {
            match config.rates.fallback.get(&currency) {
                Some(price) if *price > Decimal::ZERO => {}
                _ => {
                    return Err(ConfigError::Validation(format!(
                        "fallback rate for {currency} must be positive"
                    )))
                }
            }
        }

        let gas = config.fees.gas_fee_rate;
        if gas < Decimal::ZERO || gas >= Decimal::ONE {
            return Err(ConfigError::Validation(format!(
                "gas_fee_rate must be in [0, 1), got {gas}"
            )));
        }

        if config.auth.min_password_len == 0 {
            return Err(ConfigError::Validation(
                "min_password_len must be at least 1".to_string(),
            ));
        }

        if config.auth.hash_iterations == 0 {
            return Err(ConfigError::Validation(
                "hash_iterations must be at least 1".to_string(),
            ));
        }

        if config.rates.endpoint.trim().is_empty() && !config.rates.offline {
            return Err(ConfigError::Validation(
                "rates.endpoint is empty and offline mode is off".to_string(),
            ));
        }

        Ok(())
    }
}
