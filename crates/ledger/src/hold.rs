//! Withdrawal holds
//!
//! A hold reserves part of a balance for a pending withdrawal. It is keyed
//! by the withdrawal's transaction id and removed on approval or decline.

use artvault_core::{Amount, Currency};
use artvault_store::codec::{parse, timestamp, ts};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::balance::{check_owner, Ledger};
use crate::error::{LedgerError, LedgerResult};

/// Funds reserved against one pending withdrawal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hold {
    pub transaction_id: String,
    pub owner: String,
    pub currency: Currency,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}

impl Ledger {
    /// Reserve `amount` for a pending withdrawal
    pub fn place_hold(
        conn: &Connection,
        transaction_id: &str,
        owner: &str,
        currency: Currency,
        amount: Amount,
    ) -> LedgerResult<Hold> {
        check_owner(owner)?;
        if Self::hold(conn, transaction_id)?.is_some() {
            return Err(LedgerError::DuplicateHold(transaction_id.to_string()));
        }

        let hold = Hold {
            transaction_id: transaction_id.to_string(),
            owner: owner.to_string(),
            currency,
            amount,
            created_at: Utc::now(),
        };

        conn.execute(
            "INSERT INTO holds (transaction_id, owner, currency, amount, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                hold.transaction_id,
                hold.owner,
                hold.currency.code(),
                hold.amount.value().to_string(),
                ts(&hold.created_at),
            ],
        )?;

        tracing::debug!(transaction_id, owner, %currency, %amount, "Hold placed");
        Ok(hold)
    }

    /// Look up the hold of a transaction
    pub fn hold(conn: &Connection, transaction_id: &str) -> LedgerResult<Option<Hold>> {
        let row: Option<(String, String, String, String)> = conn
            .query_row(
                "SELECT owner, currency, amount, created_at FROM holds WHERE transaction_id = ?1",
                params![transaction_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let Some((owner, currency, amount, created_at)) = row else {
            return Ok(None);
        };

        Ok(Some(Hold {
            transaction_id: transaction_id.to_string(),
            owner,
            currency: parse("holds.currency", &currency)?,
            amount: parse("holds.amount", &amount)?,
            created_at: timestamp("holds.created_at", &created_at)?,
        }))
    }

    /// Remove the hold of a transaction, returning it if there was one
    pub fn release_hold(conn: &Connection, transaction_id: &str) -> LedgerResult<Option<Hold>> {
        let hold = Self::hold(conn, transaction_id)?;
        if hold.is_some() {
            conn.execute(
                "DELETE FROM holds WHERE transaction_id = ?1",
                params![transaction_id],
            )?;
            tracing::debug!(transaction_id, "Hold released");
        }
        Ok(hold)
    }

    /// Total held for an owner in one currency
    pub fn held(conn: &Connection, owner: &str, currency: Currency) -> LedgerResult<Amount> {
        check_owner(owner)?;

        let mut stmt =
            conn.prepare("SELECT amount FROM holds WHERE owner = ?1 AND currency = ?2")?;
        let amounts = stmt
            .query_map(params![owner, currency.code()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut total = Amount::ZERO;
        for text in amounts {
            let amount: Amount = parse("holds.amount", &text)?;
            total = total.checked_add(&amount).ok_or_else(|| LedgerError::Overflow {
                owner: owner.to_string(),
                currency,
            })?;
        }
        Ok(total)
    }

    /// Drop every hold; returns how many were removed
    pub fn clear_holds(conn: &Connection) -> LedgerResult<usize> {
        Ok(conn.execute("DELETE FROM holds", [])?)
    }
}
