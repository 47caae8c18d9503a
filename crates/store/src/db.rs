//! Store handle and transaction boundary

use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use strum_macros::{Display, EnumString};

use crate::error::{StoreError, StoreResult};
use crate::schema::{init_schema, TABLES};

/// Groups of data that can be wiped together
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DataKind {
    /// Transaction log and outstanding withdrawal holds
    Transactions,
    /// Artworks and marketplace listings
    Artworks,
    /// Admin deposit wallets
    Wallets,
    /// Ledger balances and holds
    Balances,
    /// Everything, including credentials and sessions
    All,
}

impl DataKind {
    fn tables(&self) -> &'static [&'static str] {
        match self {
            DataKind::Transactions => &["holds", "transactions"],
            DataKind::Artworks => &["marketplace_listings", "artworks"],
            DataKind::Wallets => &["deposit_wallets"],
            DataKind::Balances => &["holds", "balances"],
            DataKind::All => &TABLES,
        }
    }
}

/// SQLite-backed store
///
/// A single connection guarded by a mutex. Every multi-step operation goes
/// through [`Store::transaction`]; callers never hold the lock across an
/// `.await`.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) a database file
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        tracing::debug!(path = %path.display(), "Store opened");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Run a read or single-statement write against the connection
    pub fn with_conn<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<StoreError>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` inside a `BEGIN IMMEDIATE` transaction
    ///
    /// Commits when `f` returns `Ok`; any error rolls everything back.
    pub fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;

        let value = f(&tx)?;
        tx.commit().map_err(StoreError::from)?;
        Ok(value)
    }

    /// Delete every row of the given kind
    pub fn clear(&self, kind: DataKind) -> StoreResult<()> {
        self.transaction(|tx| {
            for table in kind.tables() {
                tx.execute(&format!("DELETE FROM {table}"), [])?;
            }
            Ok::<_, StoreError>(())
        })?;

        tracing::info!(%kind, "Cleared stored data");
        Ok(())
    }

    /// Row count of every table
    pub fn table_counts(&self) -> StoreResult<Vec<(&'static str, u64)>> {
        self.with_conn(|conn| {
            TABLES
                .iter()
                .map(|table| -> StoreResult<(&'static str, u64)> {
                    let count: i64 =
                        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                            row.get(0)
                        })?;
                    Ok((*table, count.max(0) as u64))
                })
                .collect()
        })
    }
}
