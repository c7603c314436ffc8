//! File-per-slot storage with write-then-swap replacement.
//!
//! # Responsibility
//! - Persist each slot as `<dir>/<key>.json`.
//! - Replace slot files atomically via a synced temp file plus rename.
//!
//! # Invariants
//! - Readers see either the previous file or the complete new one.
//! - Temp files never collide across writers (uuid suffix).
//! - Keys are restricted to `[A-Za-z0-9._-]` so they cannot escape `dir`.

use crate::repo::kv_repo::{KeyValueRepository, StorageError, StorageResult};
use log::{debug, warn};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const SLOT_FILE_EXTENSION: &str = "json";

/// Directory-backed key-value slots.
#[derive(Debug, Clone)]
pub struct FileKeyValueRepository {
    dir: PathBuf,
}

impl FileKeyValueRepository {
    /// Uses `dir` as the slot directory, creating it when missing.
    pub fn new(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    pub fn slot_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.{SLOT_FILE_EXTENSION}")))
    }
}

impl KeyValueRepository for FileKeyValueRepository {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.slot_path(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn put(&mut self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.slot_path(key)?;
        let tmp_path = self
            .dir
            .join(format!(".{key}.{}.tmp", Uuid::new_v4().simple()));

        if let Err(err) = write_synced(&tmp_path, value.as_bytes()) {
            discard_temp(&tmp_path);
            return Err(err);
        }

        if let Err(source) = fs::rename(&tmp_path, &path) {
            discard_temp(&tmp_path);
            return Err(StorageError::Io { path, source });
        }

        // Directory entry durability; not every platform allows syncing a dir.
        if let Ok(dir) = File::open(&self.dir) {
            let _ = dir.sync_all();
        }

        debug!(
            "event=kv_put module=repo status=ok backend=file bytes={}",
            value.len()
        );
        Ok(())
    }
}

fn write_synced(path: &Path, data: &[u8]) -> StorageResult<()> {
    let io_err = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::create(path).map_err(io_err)?;
    file.write_all(data).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    Ok(())
}

fn discard_temp(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        if err.kind() != ErrorKind::NotFound {
            warn!(
                "event=kv_put module=repo status=warn backend=file error_code=temp_cleanup_failed error={}",
                err
            );
        }
    }
}

fn validate_key(key: &str) -> StorageResult<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}
