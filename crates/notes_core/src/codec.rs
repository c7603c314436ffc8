//! Notes blob codec.
//!
//! # Responsibility
//! - Encode the whole `NoteCollection` as one JSON array of
//!   `{title, content}` objects.
//! - Decode a persisted blob back, rejecting malformed data loudly.
//!
//! # Invariants
//! - `decode_notes(&encode_notes(c)?) == c` for every collection.
//! - Empty and whitespace-only blobs decode to an empty collection, same as
//!   an absent slot.
//! - Decode errors never echo blob content (it is user text).

use crate::model::note::NoteCollection;
use serde_json::error::Category;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Persisted blob could not be decoded into a note collection.
#[derive(Debug)]
pub struct CorruptStoreError {
    blob_len: usize,
    source: serde_json::Error,
}

impl CorruptStoreError {
    /// Size in bytes of the rejected blob.
    pub fn blob_len(&self) -> usize {
        self.blob_len
    }

    /// One-based line/column where decoding stopped.
    pub fn position(&self) -> (usize, usize) {
        (self.source.line(), self.source.column())
    }
}

impl Display for CorruptStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let (line, column) = self.position();
        write!(
            f,
            "stored notes are corrupt ({} bytes): {} error at line {line} column {column}",
            self.blob_len,
            category_label(self.source.classify())
        )
    }
}

impl Error for CorruptStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

fn category_label(category: Category) -> &'static str {
    match category {
        Category::Io => "io",
        Category::Syntax => "syntax",
        Category::Data => "data",
        Category::Eof => "truncated input",
    }
}

/// Encodes the collection into its durable blob form.
pub fn encode_notes(notes: &NoteCollection) -> Result<String, serde_json::Error> {
    serde_json::to_string(notes)
}

/// Decodes a durable blob into a collection.
///
/// # Errors
/// - `CorruptStoreError` when the blob is not a JSON array of records that
///   all carry string `title` and `content` fields (`null` included).
pub fn decode_notes(blob: &str) -> Result<NoteCollection, CorruptStoreError> {
    if blob.trim().is_empty() {
        return Ok(NoteCollection::new());
    }

    serde_json::from_str(blob).map_err(|source| CorruptStoreError {
        blob_len: blob.len(),
        source,
    })
}
