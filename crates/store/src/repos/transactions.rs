use artvault_core::{Amount, TransactionStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rusqlite::{params, Connection, Row};

use super::{query_all, query_one};
use crate::codec::{parse, parse_opt, timestamp, ts};
use crate::error::{StoreError, StoreResult};
use crate::records::TransactionRecord;

const COLUMNS: &str = "id, tx_type, status, amount, currency, wallet_address, owner, username, \
                       settled_amount, rate, artwork_id, created_at, updated_at";

fn from_row(row: &Row<'_>) -> StoreResult<TransactionRecord> {
    let tx_type: String = row.get("tx_type")?;
    let status: String = row.get("status")?;
    let amount: String = row.get("amount")?;
    let currency: String = row.get("currency")?;
    let settled_amount: Option<String> = row.get("settled_amount")?;
    let rate: Option<String> = row.get("rate")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(TransactionRecord {
        id: row.get("id")?,
        tx_type: parse("transactions.tx_type", &tx_type)?,
        status: parse("transactions.status", &status)?,
        amount: parse("transactions.amount", &amount)?,
        currency: parse("transactions.currency", &currency)?,
        wallet_address: row.get("wallet_address")?,
        owner: row.get("owner")?,
        username: row.get("username")?,
        settled_amount: parse_opt("transactions.settled_amount", settled_amount.as_deref())?,
        rate: parse_opt("transactions.rate", rate.as_deref())?,
        artwork_id: row.get("artwork_id")?,
        created_at: timestamp("transactions.created_at", &created_at)?,
        updated_at: timestamp("transactions.updated_at", &updated_at)?,
    })
}

/// Repository for the `transactions` table
pub struct TransactionRepo;

impl TransactionRepo {
    pub fn insert(conn: &Connection, record: &TransactionRecord) -> StoreResult<()> {
        let result = conn.execute(
            &format!(
                "INSERT INTO transactions ({COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
            ),
            params![
                record.id,
                record.tx_type.to_string(),
                record.status.to_string(),
                record.amount.value().to_string(),
                record.currency.code(),
                record.wallet_address,
                record.owner,
                record.username,
                record.settled_amount.map(|a| a.value().to_string()),
                record.rate.map(|r| r.to_string()),
                record.artwork_id,
                ts(&record.created_at),
                ts(&record.updated_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let err = StoreError::from(e);
                if err.is_unique_violation() {
                    Err(StoreError::already_exists("Transaction", &record.id))
                } else {
                    Err(err)
                }
            }
        }
    }

    pub fn get(conn: &Connection, id: &str) -> StoreResult<Option<TransactionRecord>> {
        query_one(
            conn,
            &format!("SELECT {COLUMNS} FROM transactions WHERE id = ?1"),
            params![id],
            from_row,
        )
    }

    /// All transactions, newest first
    pub fn list(conn: &Connection) -> StoreResult<Vec<TransactionRecord>> {
        query_all(
            conn,
            &format!("SELECT {COLUMNS} FROM transactions ORDER BY created_at DESC, rowid DESC"),
            [],
            from_row,
        )
    }

    /// Transactions of one owner, newest first
    pub fn list_by_owner(conn: &Connection, owner: &str) -> StoreResult<Vec<TransactionRecord>> {
        query_all(
            conn,
            &format!(
                "SELECT {COLUMNS} FROM transactions WHERE owner = ?1
                 ORDER BY created_at DESC, rowid DESC"
            ),
            params![owner],
            from_row,
        )
    }

    /// Transactions in one status, newest first
    pub fn list_by_status(
        conn: &Connection,
        status: TransactionStatus,
    ) -> StoreResult<Vec<TransactionRecord>> {
        query_all(
            conn,
            &format!(
                "SELECT {COLUMNS} FROM transactions WHERE status = ?1
                 ORDER BY created_at DESC, rowid DESC"
            ),
            params![status.to_string()],
            from_row,
        )
    }

    /// Record a status transition with the settled quantity and rate
    pub fn update_status(
        conn: &Connection,
        id: &str,
        status: TransactionStatus,
        settled_amount: Option<Amount>,
        rate: Option<Decimal>,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let rows = conn.execute(
            "UPDATE transactions
             SET status = ?1, settled_amount = ?2, rate = ?3, updated_at = ?4
             WHERE id = ?5",
            params![
                status.to_string(),
                settled_amount.map(|a| a.value().to_string()),
                rate.map(|r| r.to_string()),
                ts(&at),
                id,
            ],
        )?;

        if rows == 0 {
            return Err(StoreError::not_found("Transaction", id));
        }
        Ok(())
    }

    /// Delete every transaction; returns the number removed
    pub fn delete_all(conn: &Connection) -> StoreResult<usize> {
        Ok(conn.execute("DELETE FROM transactions", [])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;
    use artvault_core::{Currency, TransactionType};
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn deposit(id: &str, owner: &str, created_at: DateTime<Utc>) -> TransactionRecord {
        TransactionRecord {
            id: id.to_string(),
            tx_type: TransactionType::Deposit,
            status: TransactionStatus::Processing,
            amount: Amount::new(dec!(100)).unwrap(),
            currency: Currency::Eth,
            wallet_address: Some("0xadmin".to_string()),
            owner: owner.to_string(),
            username: None,
            settled_amount: None,
            rate: None,
            artwork_id: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_insert_get_and_duplicate() {
        let store = Store::in_memory().unwrap();
        let record = deposit("DEP-1-a", "u@x.io", Utc::now());

        store.with_conn(|conn| TransactionRepo::insert(conn, &record)).unwrap();
        let read = store
            .with_conn(|conn| TransactionRepo::get(conn, "DEP-1-a"))
            .unwrap();
        assert_eq!(read, Some(record.clone()));

        let dup = store.with_conn(|conn| TransactionRepo::insert(conn, &record));
        assert!(matches!(dup, Err(StoreError::AlreadyExists { .. })));
    }

    #[test]
    fn test_list_newest_first_and_filters() {
        let store = Store::in_memory().unwrap();
        let t0 = Utc::now();
        store
            .with_conn(|conn| {
                TransactionRepo::insert(conn, &deposit("DEP-1", "a@x.io", t0))?;
                TransactionRepo::insert(conn, &deposit("DEP-2", "b@x.io", t0 + Duration::seconds(1)))?;
                TransactionRepo::insert(conn, &deposit("DEP-3", "a@x.io", t0 + Duration::seconds(2)))
            })
            .unwrap();

        let ids: Vec<String> = store
            .with_conn(TransactionRepo::list)
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["DEP-3", "DEP-2", "DEP-1"]);

        let mine = store
            .with_conn(|conn| TransactionRepo::list_by_owner(conn, "a@x.io"))
            .unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].id, "DEP-3");
    }

    #[test]
    fn test_update_status_records_settlement() {
        let store = Store::in_memory().unwrap();
        store
            .with_conn(|conn| TransactionRepo::insert(conn, &deposit("DEP-9", "a@x.io", Utc::now())))
            .unwrap();

        let settled = Amount::new(dec!(0.022222)).unwrap();
        store
            .with_conn(|conn| {
                TransactionRepo::update_status(
                    conn,
                    "DEP-9",
                    TransactionStatus::Approved,
                    Some(settled),
                    Some(dec!(4500)),
                    Utc::now(),
                )
            })
            .unwrap();

        let read = store
            .with_conn(|conn| TransactionRepo::get(conn, "DEP-9"))
            .unwrap()
            .unwrap();
        assert_eq!(read.status, TransactionStatus::Approved);
        assert_eq!(read.settled_amount, Some(settled));
        assert_eq!(read.rate, Some(dec!(4500)));

        let pending = store
            .with_conn(|conn| TransactionRepo::list_by_status(conn, TransactionStatus::Processing))
            .unwrap();
        assert!(pending.is_empty());

        let missing = store.with_conn(|conn| {
            TransactionRepo::update_status(conn, "nope", TransactionStatus::Failed, None, None, Utc::now())
        });
        assert!(missing.unwrap_err().is_not_found());
    }
}
