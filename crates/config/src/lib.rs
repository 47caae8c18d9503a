//! ArtVault Config - Configuration management
//!
//! TOML file with per-section defaults; a missing file means all defaults.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod loader;
pub mod types;

pub use loader::{ConfigError, ConfigLoader};
pub use types::{
    default_fallback, AppConfig, AuthConfig, FeesConfig, LogConfig, RatesConfig, StorageConfig,
};
