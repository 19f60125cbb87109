//! Key-value store adapter contract and implementations.
//!
//! # Responsibility
//! - Define the minimal storage primitive both deck encoders build on:
//!   plain records plus string sets.
//! - Keep backend details (SQLite, in-memory) behind one trait.
//!
//! # Invariants
//! - Adapters make no atomicity promise across calls.
//! - `set_members` of an absent key is an empty set, not an error.

use crate::db::DbError;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod keys;
mod memory;
mod sqlite;

pub use keys::KeySpace;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Adapter-level failure.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    /// Backend refused or could not serve the call: `MemoryStore` on a
    /// re-entrant call, or any external adapter without a richer error.
    Unavailable(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Unavailable(message) => write!(f, "store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Minimal key-value primitive: byte records and string sets.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()>;
    /// Adds `member` to the set at `key`. Adding an existing member is a no-op.
    fn set_add(&self, key: &str, member: &str) -> StoreResult<()>;
    /// Removes `member` from the set at `key`. Removing a missing member is a no-op.
    fn set_remove(&self, key: &str, member: &str) -> StoreResult<()>;
    fn set_members(&self, key: &str) -> StoreResult<BTreeSet<String>>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        (**self).set(key, value)
    }

    fn set_add(&self, key: &str, member: &str) -> StoreResult<()> {
        (**self).set_add(key, member)
    }

    fn set_remove(&self, key: &str, member: &str) -> StoreResult<()> {
        (**self).set_remove(key, member)
    }

    fn set_members(&self, key: &str) -> StoreResult<BTreeSet<String>> {
        (**self).set_members(key)
    }
}
