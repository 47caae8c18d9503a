//! Database schema
//!
//! Decimals are stored as TEXT and timestamps as RFC 3339 TEXT.

use rusqlite::Connection;

use crate::error::StoreResult;

pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS credentials (
    role TEXT NOT NULL,
    email TEXT NOT NULL,
    username TEXT,
    password_hash TEXT NOT NULL,
    password_salt TEXT NOT NULL,
    password_iterations INTEGER NOT NULL,
    wallet_phrase TEXT,
    created_at TEXT NOT NULL,
    last_login TEXT,
    PRIMARY KEY (role, email),
    UNIQUE (role, username)
);

CREATE TABLE IF NOT EXISTS sessions (
    role TEXT PRIMARY KEY,
    email TEXT NOT NULL,
    username TEXT,
    logged_in INTEGER NOT NULL,
    login_time TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS transactions (
    id TEXT PRIMARY KEY,
    tx_type TEXT NOT NULL,
    status TEXT NOT NULL,
    amount TEXT NOT NULL,
    currency TEXT NOT NULL,
    wallet_address TEXT,
    owner TEXT NOT NULL,
    username TEXT,
    settled_amount TEXT,
    rate TEXT,
    artwork_id TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_transactions_owner ON transactions(owner);
CREATE INDEX IF NOT EXISTS idx_transactions_status ON transactions(status);

CREATE TABLE IF NOT EXISTS balances (
    owner TEXT NOT NULL,
    currency TEXT NOT NULL,
    amount TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (owner, currency)
);

CREATE TABLE IF NOT EXISTS holds (
    transaction_id TEXT PRIMARY KEY,
    owner TEXT NOT NULL,
    currency TEXT NOT NULL,
    amount TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_holds_owner ON holds(owner, currency);

CREATE TABLE IF NOT EXISTS balance_events (
    sequence INTEGER PRIMARY KEY AUTOINCREMENT,
    owner TEXT NOT NULL,
    currency TEXT NOT NULL,
    delta TEXT NOT NULL,
    kind TEXT NOT NULL,
    transaction_id TEXT,
    usd_amount TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS artworks (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    category TEXT NOT NULL,
    image TEXT,
    price TEXT NOT NULL,
    original_price TEXT,
    owner TEXT NOT NULL,
    sold INTEGER NOT NULL DEFAULT 0,
    uploaded_to_marketplace INTEGER NOT NULL DEFAULT 0,
    gas_fee_amount TEXT,
    gas_fee_currency TEXT,
    gas_fee_usd TEXT,
    conversion_rate TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_artworks_owner ON artworks(owner);

CREATE TABLE IF NOT EXISTS marketplace_listings (
    id TEXT PRIMARY KEY REFERENCES artworks(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    artist TEXT NOT NULL,
    image TEXT,
    reserve TEXT NOT NULL,
    category TEXT NOT NULL,
    description TEXT NOT NULL,
    sold INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS deposit_wallets (
    currency TEXT PRIMARY KEY,
    address TEXT NOT NULL,
    qr_image TEXT,
    updated_at TEXT NOT NULL
);
"#;

/// Create all tables if they do not exist yet
pub(crate) fn init_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Tables in the order they are reported by [`crate::Store::table_counts`]
pub const TABLES: [&str; 9] = [
    "credentials",
    "sessions",
    "transactions",
    "balances",
    "holds",
    "balance_events",
    "artworks",
    "marketplace_listings",
    "deposit_wallets",
];
