use artvault_core::Currency;
use rusqlite::{params, Connection, Row};

use super::{query_all, query_one};
use crate::codec::{parse, timestamp, ts};
use crate::error::StoreResult;
use crate::records::DepositWallet;

fn from_row(row: &Row<'_>) -> StoreResult<DepositWallet> {
    let currency: String = row.get("currency")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(DepositWallet {
        currency: parse("deposit_wallets.currency", &currency)?,
        address: row.get("address")?,
        qr_image: row.get("qr_image")?,
        updated_at: timestamp("deposit_wallets.updated_at", &updated_at)?,
    })
}

/// Repository for the admin's per-currency deposit addresses
pub struct DepositWalletRepo;

impl DepositWalletRepo {
    /// Insert or replace the wallet for its currency
    pub fn upsert(conn: &Connection, wallet: &DepositWallet) -> StoreResult<()> {
        conn.execute(
            "INSERT INTO deposit_wallets (currency, address, qr_image, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(currency) DO UPDATE SET
                address = excluded.address,
                qr_image = excluded.qr_image,
                updated_at = excluded.updated_at",
            params![
                wallet.currency.code(),
                wallet.address,
                wallet.qr_image,
                ts(&wallet.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn get(conn: &Connection, currency: Currency) -> StoreResult<Option<DepositWallet>> {
        query_one(
            conn,
            "SELECT currency, address, qr_image, updated_at FROM deposit_wallets WHERE currency = ?1",
            params![currency.code()],
            from_row,
        )
    }

    pub fn list(conn: &Connection) -> StoreResult<Vec<DepositWallet>> {
        query_all(
            conn,
            "SELECT currency, address, qr_image, updated_at FROM deposit_wallets ORDER BY currency",
            [],
            from_row,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;
    use chrono::Utc;

    #[test]
    fn test_upsert_replaces_address() {
        let store = Store::in_memory().unwrap();
        let mut wallet = DepositWallet {
            currency: Currency::Trx,
            address: "TXa".to_string(),
            qr_image: None,
            updated_at: Utc::now(),
        };

        store.with_conn(|conn| DepositWalletRepo::upsert(conn, &wallet)).unwrap();
        wallet.address = "TXb".to_string();
        store.with_conn(|conn| DepositWalletRepo::upsert(conn, &wallet)).unwrap();

        let all = store.with_conn(DepositWalletRepo::list).unwrap();
        assert_eq!(all, vec![wallet]);
        assert!(store
            .with_conn(|conn| DepositWalletRepo::get(conn, Currency::Btc))
            .unwrap()
            .is_none());
    }
}
