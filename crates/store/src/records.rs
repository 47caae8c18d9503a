//! Stored records, one struct per table

use artvault_core::{Amount, Currency, Role, TransactionStatus, TransactionType};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Admin or user credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub role: Role,
    pub email: String,
    /// Required for users, absent for the admin
    pub username: Option<String>,
    /// Hex-encoded salted hash
    pub password_hash: String,
    /// Hex-encoded salt
    pub password_salt: String,
    /// SHA-256 rounds the hash was made with
    pub password_iterations: u32,
    /// Recovery phrase shown on the settings page
    pub wallet_phrase: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl CredentialRecord {
    /// Username if set, email otherwise
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.email)
    }
}

/// The single active session of a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub role: Role,
    pub email: String,
    pub username: Option<String>,
    pub logged_in: bool,
    pub login_time: DateTime<Utc>,
}

/// Entry of the transaction log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// `<PREFIX>-<unix millis>-<random>`
    pub id: String,
    pub tx_type: TransactionType,
    pub status: TransactionStatus,
    /// USD for deposits and withdrawals, currency quantity for sales
    pub amount: Amount,
    pub currency: Currency,
    pub wallet_address: Option<String>,
    /// Email of the ledger owner
    pub owner: String,
    pub username: Option<String>,
    /// Quantity actually credited or debited
    pub settled_amount: Option<Amount>,
    /// USD price used at settlement
    pub rate: Option<Decimal>,
    pub artwork_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Fresh id: `<PREFIX>-<unix millis>-<8 random hex chars>`
    pub fn new_id(tx_type: TransactionType) -> String {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!(
            "{}-{}-{}",
            tx_type.id_prefix(),
            Utc::now().timestamp_millis(),
            &suffix[..8]
        )
    }

    /// A new `Processing` record owned by `owner`
    pub fn new(tx_type: TransactionType, owner: &str, amount: Amount, currency: Currency) -> Self {
        let now = Utc::now();
        Self {
            id: Self::new_id(tx_type),
            tx_type,
            status: TransactionStatus::Processing,
            amount,
            currency,
            wallet_address: None,
            owner: owner.to_string(),
            username: None,
            settled_amount: None,
            rate: None,
            artwork_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Minted or admin-created artwork
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtworkRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    /// Opaque image string (data URL), never decoded
    pub image: Option<String>,
    /// `"<amount> <SYMBOL>"`
    pub price: String,
    /// USD price entered when minting
    pub original_price: Option<Decimal>,
    /// Username or email of the owner, or `"admin"`
    pub owner: String,
    pub sold: bool,
    pub uploaded_to_marketplace: bool,
    pub gas_fee: Option<GasFee>,
    pub created_at: DateTime<Utc>,
}

/// Minting fee embedded on an artwork
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasFee {
    pub amount: Amount,
    pub currency: Currency,
    pub usd: Decimal,
    pub conversion_rate: Decimal,
}

/// Public marketplace entry for an artwork
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    /// Same id as the artwork
    pub id: String,
    pub title: String,
    pub artist: String,
    pub image: Option<String>,
    /// Listed price string
    pub reserve: String,
    pub category: String,
    pub description: String,
    pub sold: bool,
}

/// Admin deposit address for one currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositWallet {
    pub currency: Currency,
    pub address: String,
    pub qr_image: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_ids() {
        let a = TransactionRecord::new_id(TransactionType::Deposit);
        let b = TransactionRecord::new_id(TransactionType::Deposit);

        assert!(a.starts_with("DEP-"));
        assert_eq!(a.split('-').count(), 3);
        assert_ne!(a, b);
        assert!(TransactionRecord::new_id(TransactionType::Sale).starts_with("SALE-"));
    }

    #[test]
    fn test_new_record_is_processing() {
        let record = TransactionRecord::new(
            TransactionType::Withdrawal,
            "ann@x.io",
            Amount::new(rust_decimal::Decimal::ONE_HUNDRED).unwrap(),
            Currency::Btc,
        );
        assert_eq!(record.status, TransactionStatus::Processing);
        assert!(record.id.starts_with("WTH-"));
        assert_eq!(record.created_at, record.updated_at);
    }
}
