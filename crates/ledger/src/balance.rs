//! Per-owner balances
//!
//! One row per `(owner, currency)`. Reads of an unknown owner lazily create
//! an all-zero row set; nothing is ever seeded with non-zero amounts.

use artvault_core::{Amount, Currency};
use artvault_store::codec::{parse, ts};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;

use crate::error::{LedgerError, LedgerResult};

/// Balances of one owner, keyed by currency
pub type Balances = BTreeMap<Currency, Amount>;

/// Result of a clamped debit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debit {
    /// What was asked for
    pub requested: Amount,
    /// What was actually taken (never more than the prior balance)
    pub debited: Amount,
    /// Balance after the debit
    pub balance: Amount,
}

/// The balance ledger
///
/// Every function takes a borrowed connection so ledger steps compose into
/// the caller's database transaction.
pub struct Ledger;

pub(crate) fn check_owner(owner: &str) -> LedgerResult<()> {
    if owner.trim().is_empty() {
        return Err(LedgerError::EmptyOwner);
    }
    Ok(())
}

impl Ledger {
    /// Stored balance, or zero when there is no row
    pub fn balance(conn: &Connection, owner: &str, currency: Currency) -> LedgerResult<Amount> {
        check_owner(owner)?;

        let stored: Option<String> = conn
            .query_row(
                "SELECT amount FROM balances WHERE owner = ?1 AND currency = ?2",
                params![owner, currency.code()],
                |row| row.get(0),
            )
            .optional()?;

        match stored {
            Some(text) => Ok(parse("balances.amount", &text)?),
            None => Ok(Amount::ZERO),
        }
    }

    /// All balances of an owner, initialising zero rows on first read
    pub fn balances(conn: &Connection, owner: &str) -> LedgerResult<Balances> {
        check_owner(owner)?;

        let mut stmt =
            conn.prepare("SELECT currency, amount FROM balances WHERE owner = ?1")?;
        let rows = stmt
            .query_map(params![owner], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if rows.is_empty() {
            let now = ts(&Utc::now());
            for currency in Currency::ALL {
                conn.execute(
                    "INSERT OR IGNORE INTO balances (owner, currency, amount, updated_at)
                     VALUES (?1, ?2, '0', ?3)",
                    params![owner, currency.code(), now],
                )?;
            }
            tracing::debug!(owner, "Initialised empty ledger");
            return Ok(Currency::ALL.iter().map(|c| (*c, Amount::ZERO)).collect());
        }

        let mut balances: Balances = Currency::ALL.iter().map(|c| (*c, Amount::ZERO)).collect();
        for (currency, amount) in rows {
            let currency: Currency = parse("balances.currency", &currency)?;
            let amount: Amount = parse("balances.amount", &amount)?;
            balances.insert(currency, amount);
        }
        Ok(balances)
    }

    fn write(conn: &Connection, owner: &str, currency: Currency, amount: Amount) -> LedgerResult<()> {
        conn.execute(
            "INSERT INTO balances (owner, currency, amount, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(owner, currency) DO UPDATE SET
                amount = excluded.amount,
                updated_at = excluded.updated_at",
            params![owner, currency.code(), amount.value().to_string(), ts(&Utc::now())],
        )?;
        Ok(())
    }

    /// Add to a balance; returns the new balance
    pub fn credit(
        conn: &Connection,
        owner: &str,
        currency: Currency,
        amount: Amount,
    ) -> LedgerResult<Amount> {
        let current = Self::balance(conn, owner, currency)?;
        let updated = current
            .checked_add(&amount)
            .ok_or_else(|| LedgerError::Overflow {
                owner: owner.to_string(),
                currency,
            })?;

        Self::write(conn, owner, currency, updated)?;
        tracing::debug!(owner, %currency, %amount, balance = %updated, "Credited");
        Ok(updated)
    }

    /// Subtract from a balance, flooring the result at zero
    pub fn debit(
        conn: &Connection,
        owner: &str,
        currency: Currency,
        amount: Amount,
    ) -> LedgerResult<Debit> {
        let current = Self::balance(conn, owner, currency)?;
        let updated = current.saturating_sub(&amount);
        let debited = current.saturating_sub(&updated);

        Self::write(conn, owner, currency, updated)?;
        tracing::debug!(owner, %currency, %debited, balance = %updated, "Debited");

        Ok(Debit {
            requested: amount,
            debited,
            balance: updated,
        })
    }

    /// Balance minus everything held for pending withdrawals, floored at zero
    pub fn available(conn: &Connection, owner: &str, currency: Currency) -> LedgerResult<Amount> {
        let balance = Self::balance(conn, owner, currency)?;
        let held = Self::held(conn, owner, currency)?;
        Ok(balance.saturating_sub(&held))
    }
}
