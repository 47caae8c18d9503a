//! Event outbox
//!
//! Events are appended to `balance_events` inside the same database
//! transaction as the balance change they describe, so the outbox never
//! disagrees with the ledger. The bus publishes them after commit and
//! replays from here.

use artvault_store::codec::{parse, parse_opt, timestamp, ts};
use rusqlite::{params, Connection, Row};

use crate::error::BusResult;
use crate::event::BalanceEvent;

const COLUMNS: &str =
    "sequence, owner, currency, delta, kind, transaction_id, usd_amount, created_at";

fn from_row(row: &Row<'_>) -> BusResult<BalanceEvent> {
    let sequence: i64 = row.get("sequence")?;
    let currency: String = row.get("currency")?;
    let delta: String = row.get("delta")?;
    let kind: String = row.get("kind")?;
    let usd_amount: Option<String> = row.get("usd_amount")?;
    let created_at: String = row.get("created_at")?;

    Ok(BalanceEvent {
        sequence: sequence.max(0) as u64,
        owner: row.get("owner")?,
        currency: parse("balance_events.currency", &currency)?,
        delta: parse("balance_events.delta", &delta)?,
        kind: parse("balance_events.kind", &kind)?,
        transaction_id: row.get("transaction_id")?,
        usd_amount: parse_opt("balance_events.usd_amount", usd_amount.as_deref())?,
        timestamp: timestamp("balance_events.created_at", &created_at)?,
    })
}

fn query(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> BusResult<Vec<BalanceEvent>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;

    let mut events = Vec::new();
    while let Some(row) = rows.next()? {
        events.push(from_row(row)?);
    }
    Ok(events)
}

/// Repository for the `balance_events` outbox
pub struct Outbox;

impl Outbox {
    /// Append an event; returns it with its assigned sequence
    pub fn append(conn: &Connection, event: BalanceEvent) -> BusResult<BalanceEvent> {
        conn.execute(
            "INSERT INTO balance_events
             (owner, currency, delta, kind, transaction_id, usd_amount, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.owner,
                event.currency.code(),
                event.delta.to_string(),
                event.kind.to_string(),
                event.transaction_id,
                event.usd_amount.map(|u| u.to_string()),
                ts(&event.timestamp),
            ],
        )?;

        let sequence = conn.last_insert_rowid().max(0) as u64;
        Ok(BalanceEvent { sequence, ..event })
    }

    /// Events with a sequence greater than `after`, oldest first
    pub fn since(conn: &Connection, after: u64) -> BusResult<Vec<BalanceEvent>> {
        query(
            conn,
            &format!("SELECT {COLUMNS} FROM balance_events WHERE sequence > ?1 ORDER BY sequence"),
            params![i64::try_from(after).unwrap_or(i64::MAX)],
        )
    }

    /// Events of one owner, oldest first
    pub fn for_owner(conn: &Connection, owner: &str) -> BusResult<Vec<BalanceEvent>> {
        query(
            conn,
            &format!("SELECT {COLUMNS} FROM balance_events WHERE owner = ?1 ORDER BY sequence"),
            params![owner],
        )
    }

    /// Highest sequence written so far (0 when empty)
    pub fn last_sequence(conn: &Connection) -> BusResult<u64> {
        let last: Option<i64> =
            conn.query_row("SELECT MAX(sequence) FROM balance_events", [], |row| row.get(0))?;
        Ok(last.unwrap_or(0).max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::BalanceEventKind;
    use artvault_core::{Amount, Currency};
    use artvault_store::Store;
    use rust_decimal_macros::dec;

    fn credit(owner: &str, v: rust_decimal::Decimal) -> BalanceEvent {
        BalanceEvent::credit(owner, Currency::Eth, Amount::new(v).unwrap(), BalanceEventKind::Deposit)
    }

    #[test]
    fn test_append_assigns_increasing_sequences() {
        let store = Store::in_memory().unwrap();
        let (a, b) = store
            .transaction(|tx| {
                let a = Outbox::append(tx, credit("a@x.io", dec!(1)))?;
                let b = Outbox::append(tx, credit("b@x.io", dec!(2)))?;
                Ok::<_, crate::BusError>((a, b))
            })
            .unwrap();

        assert!(a.sequence > 0);
        assert_eq!(b.sequence, a.sequence + 1);
        assert_eq!(store.with_conn(Outbox::last_sequence).unwrap(), b.sequence);
    }

    #[test]
    fn test_since_and_for_owner() {
        let store = Store::in_memory().unwrap();
        let first = store
            .with_conn(|conn| {
                let first = Outbox::append(conn, credit("a@x.io", dec!(1)))?;
                Outbox::append(conn, credit("b@x.io", dec!(2)))?;
                Outbox::append(conn, credit("a@x.io", dec!(3)))?;
                Ok::<_, crate::BusError>(first)
            })
            .unwrap();

        let later = store
            .with_conn(|conn| Outbox::since(conn, first.sequence))
            .unwrap();
        assert_eq!(later.len(), 2);

        let mine = store
            .with_conn(|conn| Outbox::for_owner(conn, "a@x.io"))
            .unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0], first);
        assert_eq!(mine[1].delta, dec!(3));
    }

    #[test]
    fn test_since_beyond_last_sequence_is_empty() {
        let store = Store::in_memory().unwrap();
        store
            .with_conn(|conn| Outbox::append(conn, credit("a@x.io", dec!(1))))
            .unwrap();

        for after in [u64::MAX, i64::MAX as u64 + 1, 1_000] {
            let events = store.with_conn(|conn| Outbox::since(conn, after)).unwrap();
            assert!(events.is_empty(), "after {after}");
        }
    }

    #[test]
    fn test_rolled_back_event_is_not_stored() {
        let store = Store::in_memory().unwrap();
        let result: BusResult<()> = store.transaction(|tx| {
            Outbox::append(tx, credit("a@x.io", dec!(1)))?;
            Err(crate::BusError::ChannelClosed)
        });

        assert!(result.is_err());
        assert_eq!(store.with_conn(Outbox::last_sequence).unwrap(), 0);
    }
}
