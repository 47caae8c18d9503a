use rusqlite::{params, Connection};
use rust_decimal::Decimal;

use crate::codec::parse;
use crate::error::{StoreError, StoreResult};

/// Renames across every table that refers to a user by email or username
///
/// Ledger rows (`balances`, `holds`), the transaction log and the event
/// outbox are keyed by email; artworks and marketplace listings name their
/// owner by username. Run these inside the transaction that renames the
/// credential.
pub struct OwnerRepo;

impl OwnerRepo {
    /// Move every row keyed by the email `from` to `to`
    ///
    /// `to` may only hold all-zero balance rows (left behind by a lazy read);
    /// those are dropped. Any non-zero balance under `to` is `AlreadyExists`.
    pub fn rename_email(conn: &Connection, from: &str, to: &str) -> StoreResult<usize> {
        if from == to {
            return Ok(0);
        }

        let mut stmt = conn.prepare("SELECT amount FROM balances WHERE owner = ?1")?;
        let amounts = stmt
            .query_map(params![to], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        for amount in &amounts {
            if !parse::<Decimal>("balances.amount", amount)?.is_zero() {
                return Err(StoreError::already_exists("Ledger owner", to));
            }
        }
        conn.execute("DELETE FROM balances WHERE owner = ?1", params![to])?;

        let mut moved = 0;
        for sql in [
            "UPDATE balances SET owner = ?2 WHERE owner = ?1",
            "UPDATE holds SET owner = ?2 WHERE owner = ?1",
            "UPDATE transactions SET owner = ?2 WHERE owner = ?1",
            "UPDATE balance_events SET owner = ?2 WHERE owner = ?1",
        ] {
            moved += conn.execute(sql, params![from, to])?;
        }
        Ok(moved)
    }

    /// Point artworks, listings and transactions owned by the username `from`
    /// at `to`
    pub fn rename_username(conn: &Connection, from: &str, to: &str) -> StoreResult<usize> {
        if from == to {
            return Ok(0);
        }

        let mut moved = 0;
        for sql in [
            "UPDATE marketplace_listings SET artist = ?2
             WHERE artist = ?1 AND id IN (SELECT id FROM artworks WHERE owner = ?1)",
            "UPDATE artworks SET owner = ?2 WHERE owner = ?1",
            "UPDATE transactions SET username = ?2 WHERE username = ?1",
        ] {
            moved += conn.execute(sql, params![from, to])?;
        }
        Ok(moved)
    }
}
