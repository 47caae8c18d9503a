//! ArtVault Store - SQLite persistence
//!
//! One table per entity, one connection, explicit transaction boundaries.
//! Balance and hold rows are owned by `artvault-ledger`; the event outbox by
//! `artvault-bus`. Both reuse [`codec`] and run on connections handed out by
//! [`Store`].

pub mod codec;
pub mod db;
pub mod error;
pub mod records;
pub mod repos;
pub mod schema;

pub use db::{DataKind, Store};
pub use error::{StoreError, StoreResult};
pub use records::{
    ArtworkRecord, CredentialRecord, DepositWallet, GasFee, ListingRecord, SessionRecord,
    TransactionRecord,
};
pub use repos::{
    ArtworkRepo, CredentialRepo, DepositWalletRepo, ListingRepo, OwnerRepo, SessionRepo,
    TransactionRepo,
};

/// Re-exported so downstream crates name the same connection types
pub use rusqlite::{Connection, Transaction};
