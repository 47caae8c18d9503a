//! Repository implementations
//!
//! Every repository function takes a borrowed [`rusqlite::Connection`], so it
//! can run standalone through [`crate::Store::with_conn`] or as one step of a
//! larger [`crate::Store::transaction`].

mod artworks;
mod credentials;
mod owners;
mod sessions;
mod transactions;
mod wallets;

pub use artworks::{ArtworkRepo, ListingRepo};
pub use credentials::CredentialRepo;
pub use owners::OwnerRepo;
pub use sessions::SessionRepo;
pub use transactions::TransactionRepo;
pub use wallets::DepositWalletRepo;

use rusqlite::{Connection, Params, Row};

use crate::error::StoreResult;

pub(crate) fn query_all<T, P>(
    conn: &Connection,
    sql: &str,
    params: P,
    map: fn(&Row<'_>) -> StoreResult<T>,
) -> StoreResult<Vec<T>>
where
    P: Params,
{
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(map(row)?);
    }
    Ok(out)
}

pub(crate) fn query_one<T, P>(
    conn: &Connection,
    sql: &str,
    params: P,
    map: fn(&Row<'_>) -> StoreResult<T>,
) -> StoreResult<Option<T>>
where
    P: Params,
{
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;

    match rows.next()? {
        Some(row) => Ok(Some(map(row)?)),
        None => Ok(None),
    }
}
