//! Role, transaction type and transaction status enums
//!
//! These are persisted as their string form, so the `strum` spellings are
//! part of the storage format.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Who a credential or session belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

/// Kind of a transaction record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Sale,
    Purchase,
}

impl TransactionType {
    /// Prefix used for generated transaction ids
    pub fn id_prefix(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEP",
            TransactionType::Withdrawal => "WTH",
            TransactionType::Sale => "SALE",
            TransactionType::Purchase => "PUR",
        }
    }
}

/// Lifecycle status of a transaction record
///
/// `Processing` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
pub enum TransactionStatus {
    Processing,
    Approved,
    Failed,
}

impl TransactionStatus {
    /// Returns true for `Approved` and `Failed`
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Processing)
    }

    /// Whether `self -> next` is an allowed transition
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (TransactionStatus::Processing, TransactionStatus::Approved)
                | (TransactionStatus::Processing, TransactionStatus::Failed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_role_roundtrip() {
        assert_eq!(Role::Admin.to_string(), "admin");
        assert_eq!(Role::from_str("USER").unwrap(), Role::User);
        assert!(Role::from_str("guest").is_err());
    }

    #[test]
    fn test_type_and_status_strings() {
        assert_eq!(TransactionType::Withdrawal.to_string(), "Withdrawal");
        assert_eq!(
            TransactionStatus::from_str("Processing").unwrap(),
            TransactionStatus::Processing
        );
    }

    #[test]
    fn test_transitions() {
        use TransactionStatus::*;

        assert!(Processing.can_transition_to(Approved));
        assert!(Processing.can_transition_to(Failed));
        assert!(!Approved.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Approved));
        assert!(!Approved.can_transition_to(Approved));
        assert!(Approved.is_terminal());
        assert!(!Processing.is_terminal());
    }
}
