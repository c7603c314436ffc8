//! Runtime configuration for the notes core.
//!
//! # Responsibility
//! - Resolve where the durable notes slot lives.
//! - Open a ready-to-use SQLite-backed note session from that config.
//!
//! # Invariants
//! - `NOTES_DB_PATH` wins when set to a non-blank value; otherwise the
//!   database lives in the OS temp directory.
//! - The storage key defaults to `notes`.

use crate::codec::CorruptStoreError;
use crate::repo::kv_repo::SqliteKeyValueRepository;
use crate::repo::note_store::{NoteStore, NoteStoreResult, PersistenceError};
use crate::service::note_service::{NoteEvent, NoteService};
use std::path::PathBuf;

/// Environment variable overriding the database path.
pub const DB_PATH_ENV: &str = "NOTES_DB_PATH";
/// Slot key holding the encoded note collection.
pub const DEFAULT_STORAGE_KEY: &str = "notes";
const DEFAULT_DB_FILE_NAME: &str = "notes.sqlite3";

/// SQLite-backed service with a buffered event sink.
pub type SqliteNoteService = NoteService<SqliteKeyValueRepository, Vec<NoteEvent>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesConfig {
    pub db_path: PathBuf,
    pub storage_key: String,
}

impl NotesConfig {
    /// Config for an explicit database path.
    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }

    /// Resolves config from the environment.
    pub fn from_env() -> Self {
        Self::with_db_path(resolve_db_path(std::env::var(DB_PATH_ENV).ok().as_deref()))
    }
}

/// Result of opening a session; `recovered` is set when the stored blob was
/// corrupt and the session started empty.
pub struct OpenedSession {
    pub service: SqliteNoteService,
    pub recovered: Option<CorruptStoreError>,
}

/// Opens the database named by `config` and loads the notes from it.
///
/// # Errors
/// - `Persistence` when the database cannot be opened or read.
pub fn open_sqlite_session(config: &NotesConfig) -> NoteStoreResult<OpenedSession> {
    let repo = SqliteKeyValueRepository::open(&config.db_path).map_err(PersistenceError::read)?;
    let (store, recovered) = NoteStore::open_or_recover(repo, config.storage_key.clone())?;
    Ok(OpenedSession {
        service: NoteService::new(store, Vec::new()),
        recovered,
    })
}

fn resolve_db_path(raw: Option<&str>) -> PathBuf {
    match raw.map(str::trim) {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
    }
}
