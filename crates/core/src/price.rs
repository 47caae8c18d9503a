//! Listed prices of the form `"<amount> <SYMBOL>"`, e.g. `"2 SOL"`
//!
//! The symbol is written in upper case; `"2 sol"` is not a price.

use crate::amount::Amount;
use crate::currency::{Currency, CurrencyError};
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    #[error("Invalid price format: {0:?} (expected \"<amount> <SYMBOL>\")")]
    InvalidFormat(String),

    #[error(transparent)]
    Currency(#[from] CurrencyError),
}

/// An amount of a specific currency, as shown on an artwork listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListedPrice {
    pub amount: Amount,
    pub currency: Currency,
}

impl ListedPrice {
    pub fn new(amount: Amount, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Build a listed price from a converted quantity, rounding the way
    /// listings are displayed: stablecoins are rounded up to a whole unit,
    /// everything else is kept to 6 decimals.
    pub fn from_quantity(quantity: Amount, currency: Currency) -> Self {
        let rounded = if currency.is_stablecoin() {
            quantity.value().ceil()
        } else {
            quantity
                .value()
                .round_dp_with_strategy(currency.display_decimals(), RoundingStrategy::MidpointAwayFromZero)
        };
        Self::new(Amount::clamped(rounded), currency)
    }
}

impl fmt::Display for ListedPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut value = self.amount.value();
        value.rescale(self.currency.display_decimals());
        write!(f, "{} {}", value, self.currency)
    }
}

impl FromStr for ListedPrice {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PriceError::InvalidFormat(s.to_string());

        let mut parts = s.split_whitespace();
        let (Some(number), Some(symbol), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid());
        };

        let (whole, fraction) = match number.split_once('.') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None => (number, None),
        };
        let digits_only = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());
        if !digits_only(whole) || !fraction.map_or(true, digits_only) {
            return Err(invalid());
        }
        if !symbol.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(invalid());
        }

        let value = Decimal::from_str(number).map_err(|_| invalid())?;
        let amount = Amount::new(value).map_err(|_| invalid())?;
        let currency = symbol.parse()?;

        Ok(Self { amount, currency })
    }
}
