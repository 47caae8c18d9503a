//! Column codecs
//!
//! Everything that is not an integer is stored as TEXT. These helpers turn
//! stored text back into typed values and report anything unreadable as
//! [`StoreError::Corrupt`].

use chrono::{DateTime, SecondsFormat, Utc};
use std::str::FromStr;

use crate::error::{StoreError, StoreResult};

/// Parse a stored column with its `FromStr` implementation
pub fn parse<T: FromStr>(field: &str, value: &str) -> StoreResult<T> {
    value
        .parse::<T>()
        .map_err(|_| StoreError::corrupt(field, value))
}

/// Parse an optional stored column
pub fn parse_opt<T: FromStr>(field: &str, value: Option<&str>) -> StoreResult<Option<T>> {
    value.map(|v| parse(field, v)).transpose()
}

/// Parse an RFC 3339 timestamp column
pub fn timestamp(field: &str, value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::corrupt(field, value))
}

/// Parse an optional RFC 3339 timestamp column
pub fn timestamp_opt(field: &str, value: Option<&str>) -> StoreResult<Option<DateTime<Utc>>> {
    value.map(|v| timestamp(field, v)).transpose()
}

/// Format a timestamp for storage
///
/// Fixed-width UTC form, so `ORDER BY` on the text column is chronological.
pub fn ts(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use artvault_core::{Amount, Currency};
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_typed_columns() {
        let amount: Amount = parse("amount", "0.5").unwrap();
        assert_eq!(amount.value(), dec!(0.5));

        let currency: Currency = parse("currency", "USDT_TRC20").unwrap();
        assert_eq!(currency, Currency::Usdt);

        let missing: Option<Amount> = parse_opt("amount", None).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_corrupt_values_are_reported() {
        let err = parse::<Amount>("amount", "not-a-number").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { ref field, .. } if field == "amount"));

        let err = timestamp("created_at", "yesterday").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn test_timestamp_roundtrip() {
        let now = Utc::now();
        assert_eq!(timestamp("t", &ts(&now)).unwrap(), now);
    }
}
