//! This is a small library for persisting opaque per-learner blobs.
//!
//! Storage model:
//! 1. Each learner is identified by an opaque key string. How that key is derived (hashing an
//!    account id, a session cookie, ...) is the caller's business.
//! 2. Each key maps to exactly one blob. Writing replaces the whole blob, there are no partial
//!    updates.
//! 3. Deleting a key removes the blob wholesale. Deleting a key that was never written is not an
//!    error.
//!
//! The store never interprets the bytes. Callers that need ordering guarantees (for example, a
//! read-modify-write of the same key from two sessions) have to serialize those calls themselves.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid key: {0:?}")]
    InvalidKey(String),
}

/// Core trait for a key-value store holding one blob per learner.
pub trait BlobStore {
    /// Fetch the blob for `key`, or `None` if nothing was ever stored under it.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Store `bytes` under `key`, replacing any previous blob.
    fn put(&mut self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// Remove the blob for `key`, if any.
    fn delete(&mut self, key: &str) -> Result<(), StoreError>;
}

impl<S: BlobStore + ?Sized> BlobStore for &mut S {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key)
    }

    fn put(&mut self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        (**self).put(key, bytes)
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key)
    }
}

/// Keys are learner ids, so only a conservative character set is accepted.
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && key.len() <= 128
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}
