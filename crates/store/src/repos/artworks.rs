use rusqlite::{params, Connection, Row};

use super::{query_all, query_one};
use crate::codec::{parse, parse_opt, timestamp, ts};
use crate::error::{StoreError, StoreResult};
use crate::records::{ArtworkRecord, GasFee, ListingRecord};

const ARTWORK_COLUMNS: &str = "id, title, description, category, image, price, original_price, \
                               owner, sold, uploaded_to_marketplace, gas_fee_amount, \
                               gas_fee_currency, gas_fee_usd, conversion_rate, created_at";

fn artwork_from_row(row: &Row<'_>) -> StoreResult<ArtworkRecord> {
    let original_price: Option<String> = row.get("original_price")?;
    let created_at: String = row.get("created_at")?;

    let fee_amount: Option<String> = row.get("gas_fee_amount")?;
    let fee_currency: Option<String> = row.get("gas_fee_currency")?;
    let fee_usd: Option<String> = row.get("gas_fee_usd")?;
    let fee_rate: Option<String> = row.get("conversion_rate")?;

    let gas_fee = match (fee_amount, fee_currency, fee_usd, fee_rate) {
        (Some(amount), Some(currency), Some(usd), Some(rate)) => Some(GasFee {
            amount: parse("artworks.gas_fee_amount", &amount)?,
            currency: parse("artworks.gas_fee_currency", &currency)?,
            usd: parse("artworks.gas_fee_usd", &usd)?,
            conversion_rate: parse("artworks.conversion_rate", &rate)?,
        }),
        _ => None,
    };

    Ok(ArtworkRecord {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        category: row.get("category")?,
        image: row.get("image")?,
        price: row.get("price")?,
        original_price: parse_opt("artworks.original_price", original_price.as_deref())?,
        owner: row.get("owner")?,
        sold: row.get("sold")?,
        uploaded_to_marketplace: row.get("uploaded_to_marketplace")?,
        gas_fee,
        created_at: timestamp("artworks.created_at", &created_at)?,
    })
}

/// Repository for the `artworks` table
pub struct ArtworkRepo;

impl ArtworkRepo {
    pub fn insert(conn: &Connection, artwork: &ArtworkRecord) -> StoreResult<()> {
        let fee = artwork.gas_fee.as_ref();
        let result = conn.execute(
            &format!(
                "INSERT INTO artworks ({ARTWORK_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
            ),
            params![
                artwork.id,
                artwork.title,
                artwork.description,
                artwork.category,
                artwork.image,
                artwork.price,
                artwork.original_price.map(|p| p.to_string()),
                artwork.owner,
                artwork.sold,
                artwork.uploaded_to_marketplace,
                fee.map(|f| f.amount.value().to_string()),
                fee.map(|f| f.currency.code()),
                fee.map(|f| f.usd.to_string()),
                fee.map(|f| f.conversion_rate.to_string()),
                ts(&artwork.created_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let err = StoreError::from(e);
                if err.is_unique_violation() {
                    Err(StoreError::already_exists("Artwork", &artwork.id))
                } else {
                    Err(err)
                }
            }
        }
    }

    pub fn get(conn: &Connection, id: &str) -> StoreResult<Option<ArtworkRecord>> {
        query_one(
            conn,
            &format!("SELECT {ARTWORK_COLUMNS} FROM artworks WHERE id = ?1"),
            params![id],
            artwork_from_row,
        )
    }

    /// All artworks, newest first
    pub fn list(conn: &Connection) -> StoreResult<Vec<ArtworkRecord>> {
        query_all(
            conn,
            &format!("SELECT {ARTWORK_COLUMNS} FROM artworks ORDER BY created_at DESC, rowid DESC"),
            [],
            artwork_from_row,
        )
    }

    /// Artworks owned by any of the given names (username and email)
    pub fn list_by_owner(conn: &Connection, owners: &[&str]) -> StoreResult<Vec<ArtworkRecord>> {
        let mut out = Vec::new();
        for artwork in Self::list(conn)? {
            if owners.contains(&artwork.owner.as_str()) {
                out.push(artwork);
            }
        }
        Ok(out)
    }

    pub fn set_sold(conn: &Connection, id: &str) -> StoreResult<()> {
        let rows = conn.execute("UPDATE artworks SET sold = 1 WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StoreError::not_found("Artwork", id));
        }
        Ok(())
    }

    pub fn set_uploaded(conn: &Connection, id: &str) -> StoreResult<()> {
        let rows = conn.execute(
            "UPDATE artworks SET uploaded_to_marketplace = 1 WHERE id = ?1",
            params![id],
        )?;
        if rows == 0 {
            return Err(StoreError::not_found("Artwork", id));
        }
        Ok(())
    }

    /// Delete an artwork; its listing goes with it
    pub fn delete(conn: &Connection, id: &str) -> StoreResult<()> {
        conn.execute("DELETE FROM marketplace_listings WHERE id = ?1", params![id])?;
        let rows = conn.execute("DELETE FROM artworks WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StoreError::not_found("Artwork", id));
        }
        Ok(())
    }
}

const LISTING_COLUMNS: &str = "id, title, artist, image, reserve, category, description, sold";

fn listing_from_row(row: &Row<'_>) -> StoreResult<ListingRecord> {
    Ok(ListingRecord {
        id: row.get("id")?,
        title: row.get("title")?,
        artist: row.get("artist")?,
        image: row.get("image")?,
        reserve: row.get("reserve")?,
        category: row.get("category")?,
        description: row.get("description")?,
        sold: row.get("sold")?,
    })
}

/// Repository for the `marketplace_listings` table
pub struct ListingRepo;

impl ListingRepo {
    /// Insert a listing unless one already exists; returns whether a row was
    /// written
    pub fn insert_if_absent(conn: &Connection, listing: &ListingRecord) -> StoreResult<bool> {
        let rows = conn.execute(
            &format!(
                "INSERT OR IGNORE INTO marketplace_listings ({LISTING_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            ),
            params![
                listing.id,
                listing.title,
                listing.artist,
                listing.image,
                listing.reserve,
                listing.category,
                listing.description,
                listing.sold,
            ],
        )?;
        Ok(rows > 0)
    }

    pub fn get(conn: &Connection, id: &str) -> StoreResult<Option<ListingRecord>> {
        query_one(
            conn,
            &format!("SELECT {LISTING_COLUMNS} FROM marketplace_listings WHERE id = ?1"),
            params![id],
            listing_from_row,
        )
    }

    pub fn list(conn: &Connection) -> StoreResult<Vec<ListingRecord>> {
        query_all(
            conn,
            &format!("SELECT {LISTING_COLUMNS} FROM marketplace_listings ORDER BY rowid DESC"),
            [],
            listing_from_row,
        )
    }

    /// Flag a listing sold; returns false when the artwork was never listed
    pub fn set_sold(conn: &Connection, id: &str) -> StoreResult<bool> {
        let rows = conn.execute(
            "UPDATE marketplace_listings SET sold = 1 WHERE id = ?1",
            params![id],
        )?;
        Ok(rows > 0)
    }
}
