//! Balance events for pub/sub distribution

use artvault_core::{Amount, Currency};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// What caused a balance change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
pub enum BalanceEventKind {
    /// Approved deposit credited
    Deposit,
    /// Approved withdrawal debited
    Withdrawal,
    /// Artwork sale credited to the seller
    Sale,
    /// Minting fee debited
    GasFee,
}

/// A committed change to one owner's balance in one currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEvent {
    /// Outbox position; 0 until appended
    pub sequence: u64,
    pub owner: String,
    pub currency: Currency,
    /// Signed change: positive for credits, negative for debits
    pub delta: Decimal,
    pub kind: BalanceEventKind,
    pub transaction_id: Option<String>,
    pub usd_amount: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

impl BalanceEvent {
    fn new(owner: &str, currency: Currency, delta: Decimal, kind: BalanceEventKind) -> Self {
        Self {
            sequence: 0,
            owner: owner.to_string(),
            currency,
            delta,
            kind,
            transaction_id: None,
            usd_amount: None,
            timestamp: Utc::now(),
        }
    }

    /// A credit of `amount`
    pub fn credit(owner: &str, currency: Currency, amount: Amount, kind: BalanceEventKind) -> Self {
        Self::new(owner, currency, amount.value(), kind)
    }

    /// A debit of `amount`
    pub fn debit(owner: &str, currency: Currency, amount: Amount, kind: BalanceEventKind) -> Self {
        Self::new(owner, currency, -amount.value(), kind)
    }

    pub fn with_transaction(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    pub fn with_usd(mut self, usd: Decimal) -> Self {
        self.usd_amount = Some(usd);
        self
    }

    pub fn is_credit(&self) -> bool {
        self.delta > Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_debit_is_negative() {
        let amount = Amount::new(dec!(0.25)).unwrap();
        let event = BalanceEvent::debit("a@x.io", Currency::Sol, amount, BalanceEventKind::GasFee);

        assert_eq!(event.delta, dec!(-0.25));
        assert!(!event.is_credit());
        assert_eq!(event.sequence, 0);
    }

    #[test]
    fn test_builder_fields() {
        let amount = Amount::new(dec!(2)).unwrap();
        let event = BalanceEvent::credit("a@x.io", Currency::Sol, amount, BalanceEventKind::Sale)
            .with_transaction("SALE-1")
            .with_usd(dec!(460));

        assert_eq!(event.transaction_id.as_deref(), Some("SALE-1"));
        assert_eq!(event.usd_amount, Some(dec!(460)));
        assert_eq!(event.kind.to_string(), "Sale");
    }
}
