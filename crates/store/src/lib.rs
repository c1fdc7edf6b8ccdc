//! Draft persistence.
//!
//! A [`DraftStore`] is a small synchronous key/value store (the role browser
//! local storage plays for a web form). [`DraftRepo`] sits on top of it and
//! owns the encoding of one [`DraftSnapshot`] under one key.
//!
//! Implementations:
//!
//! - [`MemoryStore`]: process-local map, optionally with a byte quota.
//! - [`FileStore`]: one JSON file per key in a directory.

pub mod file;
pub mod memory;
pub mod repo;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use repo::{DraftRepo, DraftSnapshot, DEFAULT_DRAFT_KEY};

/// Errors raised by draft storage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored draft is malformed: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Failed to encode draft: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Storage quota exceeded: {needed} bytes needed, limit is {limit} bytes")]
    QuotaExceeded { needed: usize, limit: usize },

    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),
}

/// Synchronous string key/value storage.
///
/// Writes replace the whole value. Concurrent writers to the same key are
/// last-write-wins.
pub trait DraftStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    fn contains(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get(key)?.is_some())
    }
}
