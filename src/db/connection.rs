use rusqlite::Connection;
use std::path::Path;
use tracing::info;

use crate::errors::StoreError;

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

/// Single SQLite connection. Cycles never overlap, so no pool or locking.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if needed) the database file and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.display().to_string(),
            source,
        })?;

        // Every insert must hit disk before its notification goes out.
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "FULL")?;

        let db = Self { conn };
        db.init()?;
        info!("✅ Database ready at {}", path.display());
        Ok(db)
    }

    /// Throwaway database.
    #[cfg(test)]
    pub fn in_memory() -> Result<Self, StoreError> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// Provides the connection to the closure.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        f(&self.conn)
    }
}
