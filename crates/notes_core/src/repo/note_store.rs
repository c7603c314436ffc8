//! Canonical note collection with write-through persistence.
//!
//! # Responsibility
//! - Own the in-memory `NoteCollection` for one session.
//! - Re-encode and persist the whole collection after every mutation.
//! - Classify failures as `IndexOutOfRange`, `CorruptStore` or
//!   `Persistence`.
//!
//! # Invariants
//! - Single logical writer: callers serialize access (`&mut self`).
//! - A failed persist leaves the in-memory mutation applied and raises the
//!   unsaved-changes flag until a later `persist` succeeds.
//! - Out-of-range positions never mutate the collection.
//! - Recovery from a corrupt blob hands out a store only after the blob is
//!   copied to its backup slot.
//! - Log events carry indices and sizes only, never note text.

use crate::codec::{decode_notes, encode_notes, CorruptStoreError};
use crate::model::note::{Note, NoteCollection};
use crate::repo::kv_repo::{KeyValueRepository, StorageError};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Suffix of the slot that keeps an unreadable blob after recovery.
pub const CORRUPT_BACKUP_SUFFIX: &str = ".corrupt";

pub type NoteStoreResult<T> = Result<T, NoteStoreError>;

/// Storage read or write failed.
#[derive(Debug)]
pub struct PersistenceError {
    operation: &'static str,
    source: StorageError,
}

impl PersistenceError {
    pub(crate) fn read(source: StorageError) -> Self {
        Self {
            operation: "read",
            source,
        }
    }

    fn write(source: StorageError) -> Self {
        Self {
            operation: "write",
            source,
        }
    }

    /// `read` or `write`.
    pub fn operation(&self) -> &'static str {
        self.operation
    }
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to {} notes: {}", self.operation, self.source)
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Error taxonomy for note store operations.
#[derive(Debug)]
pub enum NoteStoreError {
    /// Position is stale or invalid for the current collection.
    IndexOutOfRange { index: i64, len: usize },
    /// Persisted blob could not be decoded.
    CorruptStore(CorruptStoreError),
    /// Durable storage rejected a read or write.
    Persistence(PersistenceError),
}

impl Display for NoteStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndexOutOfRange { index, len } => {
                write!(f, "note index {index} out of range for {len} note(s)")
            }
            Self::CorruptStore(err) => write!(f, "{err}"),
            Self::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NoteStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::IndexOutOfRange { .. } => None,
            Self::CorruptStore(err) => Some(err),
            Self::Persistence(err) => Some(err),
        }
    }
}

impl From<CorruptStoreError> for NoteStoreError {
    fn from(value: CorruptStoreError) -> Self {
        Self::CorruptStore(value)
    }
}

impl From<PersistenceError> for NoteStoreError {
    fn from(value: PersistenceError) -> Self {
        Self::Persistence(value)
    }
}

/// Single source of truth for the note list and its durable blob.
#[derive(Debug)]
pub struct NoteStore<R: KeyValueRepository> {
    repo: R,
    key: String,
    notes: NoteCollection,
    unsaved: bool,
}

impl<R: KeyValueRepository> NoteStore<R> {
    /// Opens the store and loads the collection stored under `key`.
    ///
    /// # Errors
    /// - `CorruptStore` when the stored blob cannot be decoded.
    /// - `Persistence` when the slot cannot be read.
    pub fn open(repo: R, key: impl Into<String>) -> NoteStoreResult<Self> {
        let mut store = Self {
            repo,
            key: key.into(),
            notes: NoteCollection::new(),
            unsaved: false,
        };
        store.notes = store.load()?;
        info!(
            "event=notes_open module=store status=ok len={}",
            store.notes.len()
        );
        Ok(store)
    }

    /// Opens the store, starting empty when the stored blob is corrupt.
    ///
    /// The unreadable blob is copied to `<key>.corrupt` before the store is
    /// handed out; the decode error is returned next to the store so the
    /// host can tell the user.
    ///
    /// # Errors
    /// - `Persistence` when the slot cannot be read, or when the backup copy
    ///   cannot be written. No store is returned then, so nothing can
    ///   overwrite the only copy of the data.
    pub fn open_or_recover(
        repo: R,
        key: impl Into<String>,
    ) -> NoteStoreResult<(Self, Option<CorruptStoreError>)> {
        let mut store = Self {
            repo,
            key: key.into(),
            notes: NoteCollection::new(),
            unsaved: false,
        };
        let Some(blob) = store
            .repo
            .get(&store.key)
            .map_err(PersistenceError::read)?
        else {
            return Ok((store, None));
        };

        match decode_notes(&blob) {
            Ok(notes) => {
                store.notes = notes;
                Ok((store, None))
            }
            Err(err) => {
                warn!(
                    "event=notes_open module=store status=recovering error_code=corrupt_store blob_bytes={}",
                    err.blob_len()
                );
                store.backup_corrupt_blob(&blob)?;
                Ok((store, Some(err)))
            }
        }
    }

    /// Reads and decodes the slot directly from storage.
    ///
    /// Absent and empty slots both yield an empty collection.
    pub fn load(&self) -> NoteStoreResult<NoteCollection> {
        let blob = self
            .repo
            .get(&self.key)
            .map_err(PersistenceError::read)?;
        match blob {
            None => Ok(NoteCollection::new()),
            Some(blob) => Ok(decode_notes(&blob)?),
        }
    }

    /// Replaces the in-memory collection with the stored one.
    ///
    /// Discards unsaved in-memory changes.
    pub fn reload(&mut self) -> NoteStoreResult<()> {
        if self.unsaved {
            warn!("event=notes_reload module=store status=warn discarding_unsaved=true");
        }
        self.notes = self.load()?;
        self.unsaved = false;
        Ok(())
    }

    /// Appends a note at the end and persists. Returns its index.
    pub fn append(
        &mut self,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> NoteStoreResult<usize> {
        let index = self.notes.push(Note::new(title, content));
        debug!("event=note_append module=store index={index}");
        self.persist()?;
        Ok(index)
    }

    /// Overwrites the note at `index` and persists.
    pub fn replace(
        &mut self,
        index: usize,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> NoteStoreResult<()> {
        let len = self.notes.len();
        if self.notes.replace(index, Note::new(title, content)).is_none() {
            return Err(out_of_range(index, len));
        }
        debug!("event=note_replace module=store index={index}");
        self.persist()
    }

    /// Removes the note at `index`, shifting later notes down, and persists.
    pub fn remove_at(&mut self, index: usize) -> NoteStoreResult<Note> {
        let len = self.notes.len();
        let removed = self
            .notes
            .remove(index)
            .ok_or_else(|| out_of_range(index, len))?;
        debug!("event=note_remove module=store index={index}");
        self.persist()?;
        Ok(removed)
    }

    /// Encodes the whole collection and replaces the stored blob.
    pub fn persist(&mut self) -> NoteStoreResult<()> {
        let started_at = Instant::now();
        self.unsaved = true;

        let blob = encode_notes(&self.notes)
            .map_err(|err| PersistenceError::write(StorageError::Encode(err)))?;
        if let Err(err) = self.repo.put(&self.key, &blob) {
            error!(
                "event=notes_persist module=store status=error len={} duration_ms={} error_code=write_failed error={}",
                self.notes.len(),
                started_at.elapsed().as_millis(),
                err
            );
            return Err(PersistenceError::write(err).into());
        }

        self.unsaved = false;
        debug!(
            "event=notes_persist module=store status=ok len={} bytes={} duration_ms={}",
            self.notes.len(),
            blob.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// Converts a UI-supplied signed position into a valid index.
    pub fn resolve_position(&self, position: i64) -> NoteStoreResult<usize> {
        let len = self.notes.len();
        usize::try_from(position)
            .ok()
            .filter(|index| *index < len)
            .ok_or(NoteStoreError::IndexOutOfRange {
                index: position,
                len,
            })
    }

    pub fn notes(&self) -> &NoteCollection {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Note> {
        self.notes.get(index)
    }

    /// Whether the in-memory collection differs from the last durable write.
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn repo_mut(&mut self) -> &mut R {
        &mut self.repo
    }

    fn backup_corrupt_blob(&mut self, raw: &str) -> NoteStoreResult<()> {
        let backup_key = format!("{}{CORRUPT_BACKUP_SUFFIX}", self.key);
        if let Err(err) = self.repo.put(&backup_key, raw) {
            error!(
                "event=notes_backup module=store status=error error_code=write_failed error={}",
                err
            );
            return Err(PersistenceError::write(err).into());
        }
        info!(
            "event=notes_backup module=store status=ok bytes={}",
            raw.len()
        );
        Ok(())
    }
}

fn out_of_range(index: usize, len: usize) -> NoteStoreError {
    NoteStoreError::IndexOutOfRange {
        index: i64::try_from(index).unwrap_or(i64::MAX),
        len,
    }
}

#[cfg(test)]
mod tests {
    use super::{NoteStore, NoteStoreError};
    use crate::repo::kv_repo::InMemoryKeyValueRepository;

    #[test]
    fn resolve_position_rejects_negative_and_past_end() {
        let repo =
            InMemoryKeyValueRepository::with_slot("notes", r#"[{"title":"a","content":"b"}]"#);
        let store = NoteStore::open(repo, "notes").unwrap();

        assert_eq!(store.resolve_position(0).unwrap(), 0);
        for position in [-1, 1, i64::MIN, i64::MAX] {
            let err = store.resolve_position(position).unwrap_err();
            assert!(matches!(
                err,
                NoteStoreError::IndexOutOfRange { index, len: 1 } if index == position
            ));
        }
    }

    #[test]
    fn every_mutation_writes_through_once() {
        let mut store = NoteStore::open(InMemoryKeyValueRepository::new(), "notes").unwrap();
        store.append("a", "1").unwrap();
        store.replace(0, "a2", "1b").unwrap();
        store.remove_at(0).unwrap();
        assert_eq!(store.repo().writes(), 3);
        assert_eq!(store.repo().slot("notes"), Some("[]"));
    }
}
