//! Key-value slot contract plus in-memory and SQLite implementations.
//!
//! # Responsibility
//! - Expose `get`/`put` over named string slots.
//! - Keep backend transport errors in one `StorageError` type.
//!
//! # Invariants
//! - `put` is all-or-nothing per slot.
//! - Missing slots read as `None`, not as an error.

use crate::db::{open_db, open_db_in_memory, DbError};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub type StorageResult<T> = Result<T, StorageError>;

/// Transport-level failure of a key-value backend.
#[derive(Debug)]
pub enum StorageError {
    Db(DbError),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Encode(serde_json::Error),
    InvalidKey(String),
    Unavailable(String),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Encode(err) => write!(f, "failed to encode notes: {err}"),
            Self::InvalidKey(key) => write!(f, "invalid storage key `{key}`"),
            Self::Unavailable(message) => write!(f, "storage unavailable: {message}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Encode(err) => Some(err),
            Self::InvalidKey(_) | Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// One durable key-value namespace holding string blobs.
pub trait KeyValueRepository {
    /// Reads the current value of `key`, `None` when never written.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    /// Atomically replaces the value of `key`.
    fn put(&mut self, key: &str, value: &str) -> StorageResult<()>;
}

/// Process-local backend, used by tests and hosts without durable storage.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueRepository {
    slots: HashMap<String, String>,
    fail_writes: bool,
    writes: usize,
}

impl InMemoryKeyValueRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend with one slot already populated.
    pub fn with_slot(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut repo = Self::default();
        repo.slots.insert(key.into(), value.into());
        repo
    }

    /// Makes every following `put` fail until switched back off.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Number of successful `put` calls so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Raw slot value, bypassing the trait.
    pub fn slot(&self, key: &str) -> Option<&str> {
        self.slots.get(key).map(String::as_str)
    }
}

impl KeyValueRepository for InMemoryKeyValueRepository {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.slots.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> StorageResult<()> {
        if self.fail_writes {
            return Err(StorageError::Unavailable(format!(
                "writes disabled for slot `{key}`"
            )));
        }
        self.slots.insert(key.to_string(), value.to_string());
        self.writes += 1;
        Ok(())
    }
}

/// SQLite-backed slot storage over the `kv_slots` table.
pub struct SqliteKeyValueRepository {
    conn: Connection,
}

impl SqliteKeyValueRepository {
    /// Wraps a migrated/ready connection.
    pub fn try_new(conn: Connection) -> StorageResult<Self> {
        ensure_connection_ready(&conn)?;
        Ok(Self { conn })
    }

    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::try_new(open_db(path)?)
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    /// Underlying connection, for diagnostics and tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl KeyValueRepository for SqliteKeyValueRepository {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_slots WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put(&mut self, key: &str, value: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO kv_slots (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        debug!(
            "event=kv_put module=repo status=ok backend=sqlite bytes={}",
            value.len()
        );
        Ok(())
    }
}

fn ensure_connection_ready(conn: &Connection) -> StorageResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'kv_slots'
        );",
        [],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(DbError::MissingRequiredTable("kv_slots").into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        InMemoryKeyValueRepository, KeyValueRepository, SqliteKeyValueRepository, StorageError,
    };
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn in_memory_write_switch_blocks_puts() {
        let mut repo = InMemoryKeyValueRepository::new();
        repo.put("notes", "[]").unwrap();
        repo.set_fail_writes(true);
        let err = repo.put("notes", "[1]").unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
        assert_eq!(repo.slot("notes"), Some("[]"));
        assert_eq!(repo.writes(), 1);
    }

    #[test]
    fn sqlite_upsert_replaces_previous_value() {
        let mut repo = SqliteKeyValueRepository::open_in_memory().unwrap();
        assert_eq!(repo.get("notes").unwrap(), None);

        repo.put("notes", "first").unwrap();
        repo.put("notes", "second").unwrap();
        assert_eq!(repo.get("notes").unwrap().as_deref(), Some("second"));

        let rows: i64 = repo
            .connection()
            .query_row("SELECT COUNT(*) FROM kv_slots;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn sqlite_rejects_unmigrated_connection() {
        let conn = Connection::open_in_memory().unwrap();
        let err = SqliteKeyValueRepository::try_new(conn).err().unwrap();
        assert!(matches!(
            err,
            StorageError::Db(DbError::MissingRequiredTable("kv_slots"))
        ));
    }
}
