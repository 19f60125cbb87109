//! SQLite-backed key-value adapter.
//!
//! # Invariants
//! - The connection must come from `open_db*` (schema at latest version).
//! - Each call is a single autocommit statement.

use super::{KeyValueStore, StoreResult};
use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;

/// Key-value adapter over the `kv_records` / `kv_set_members` tables.
pub struct SqliteStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStore<'conn> {
    /// Wraps a migrated connection after checking its schema version.
    ///
    /// # Errors
    /// - `DbError::UninitializedConnection` when migrations were not applied.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        let actual_version = current_user_version(conn)?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(DbError::UninitializedConnection {
                expected_version,
                actual_version,
            }
            .into());
        }
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteStore<'_> {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_records WHERE key = ?1;",
                [key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO kv_records (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
        Ok(())
    }

    fn set_add(&self, key: &str, member: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO kv_set_members (key, member) VALUES (?1, ?2);",
            params![key, member],
        )?;
        Ok(())
    }

    fn set_remove(&self, key: &str, member: &str) -> StoreResult<()> {
        self.conn.execute(
            "DELETE FROM kv_set_members WHERE key = ?1 AND member = ?2;",
            params![key, member],
        )?;
        Ok(())
    }

    fn set_members(&self, key: &str) -> StoreResult<BTreeSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT member FROM kv_set_members WHERE key = ?1;")?;
        let mut rows = stmt.query([key])?;
        let mut members = BTreeSet::new();
        while let Some(row) = rows.next()? {
            members.insert(row.get::<_, String>(0)?);
        }
        Ok(members)
    }
}
