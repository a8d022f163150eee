use super::Database;
use crate::domain::listing::{Listing, ListingId, SeenListing};
use crate::errors::StoreError;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use std::path::Path;

const SELECT_COLUMNS: &str = r#"
    SELECT identity, title, price, address, detail_url, image_url,
           bedrooms, bathrooms, sqft, first_seen_at
    FROM seen_listings
"#;

/// Durable set of every listing identity that has been notified.
///
/// Rows are insert-only. Re-inserting a known identity changes nothing, which is
/// what keeps `first_seen_at` stable and stops repeat notifications.
pub struct SeenStore {
    db: Database,
}

impl SeenStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self {
            db: Database::open(path)?,
        })
    }

    #[cfg(test)]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn contains(&self, id: &ListingId) -> Result<bool, StoreError> {
        self.db.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM seen_listings WHERE identity = ?1",
                    params![id.as_str()],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Record `listing` as seen at `first_seen_at`.
    ///
    /// Returns `false` (and leaves the stored row untouched) if the identity was
    /// already present.
    pub fn insert(&self, listing: &Listing, first_seen_at: DateTime<Utc>) -> Result<bool, StoreError> {
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                r#"
                INSERT OR IGNORE INTO seen_listings (
                    identity, title, price, address, detail_url, image_url,
                    bedrooms, bathrooms, sqft, first_seen_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
                params![
                    listing.id.as_str(),
                    listing.title,
                    listing.price,
                    listing.address,
                    listing.detail_url,
                    listing.image_url,
                    listing.bedrooms,
                    listing.bathrooms,
                    listing.sqft,
                    first_seen_at,
                ],
            )?;
            Ok(changed == 1)
        })
    }

    #[cfg(test)]
    pub fn get(&self, id: &ListingId) -> Result<Option<SeenListing>, StoreError> {
        self.db.with_conn(|conn| {
            let sql = format!("{SELECT_COLUMNS} WHERE identity = ?1");
            let row = conn
                .query_row(&sql, params![id.as_str()], row_to_seen)
                .optional()?;
            Ok(row)
        })
    }

    /// Everything ever recorded, oldest first. Read-only.
    pub fn all(&self) -> Result<Vec<SeenListing>, StoreError> {
        self.db.with_conn(|conn| {
            let sql = format!("{SELECT_COLUMNS} ORDER BY first_seen_at, identity");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], row_to_seen)?;

            let mut out = Vec::new();
            for r in rows {
                out.push(r?);
            }
            Ok(out)
        })
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        self.db.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM seen_listings", [], |row| row.get(0))?;
            Ok(n as usize)
        })
    }
}

fn row_to_seen(row: &Row<'_>) -> rusqlite::Result<SeenListing> {
    Ok(SeenListing {
        listing: Listing {
            id: ListingId::new(row.get::<_, String>(0)?),
            title: row.get(1)?,
            price: row.get(2)?,
            address: row.get(3)?,
            detail_url: row.get(4)?,
            image_url: row.get(5)?,
            bedrooms: row.get(6)?,
            bathrooms: row.get(7)?,
            sqft: row.get(8)?,
        },
        first_seen_at: row.get(9)?,
    })
}
