use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};

use crate::{BlobStore, StoreError, validate_key};

const CREATE_USERS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS users (
        user_id TEXT PRIMARY KEY,
        data BLOB NOT NULL,
        updated_at INTEGER NOT NULL DEFAULT (unixepoch())
    )";

/// Stores every blob as a row of a single `users` table in an SQLite database.
pub struct SqliteStore {
    connection: Connection,
}

impl SqliteStore {
    /// Open (and create if needed) the database at `path`, along with its parent directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let connection = Connection::open(path)?;
        log::debug!("Opened progress database at {}", path.display());
        Self::with_connection(connection)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(connection: Connection) -> Result<Self, StoreError> {
        connection.execute_batch(CREATE_USERS_TABLE)?;
        Ok(Self { connection })
    }

    /// Unix time of the last write to `key`.
    pub fn updated_at(&self, key: &str) -> Result<Option<i64>, StoreError> {
        validate_key(key)?;
        let updated_at = self
            .connection
            .query_row(
                "SELECT updated_at FROM users WHERE user_id = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(updated_at)
    }

    /// Every stored key, sorted.
    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .connection
            .prepare("SELECT user_id FROM users ORDER BY user_id")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}

impl BlobStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        validate_key(key)?;
        let data = self
            .connection
            .query_row(
                "SELECT data FROM users WHERE user_id = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(data)
    }

    fn put(&mut self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        validate_key(key)?;
        self.connection.execute(
            "INSERT INTO users (user_id, data, updated_at) VALUES (?1, ?2, unixepoch())
             ON CONFLICT(user_id) DO UPDATE SET data = excluded.data, updated_at = unixepoch()",
            params![key, bytes],
        )?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        let deleted = self
            .connection
            .execute("DELETE FROM users WHERE user_id = ?1", params![key])?;
        if deleted == 0 {
            log::debug!("Nothing stored for {key:?}");
        }
        Ok(())
    }
}
