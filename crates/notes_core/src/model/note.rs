//! Note value record and ordered collection.
//!
//! # Responsibility
//! - Define the `{title, content}` record persisted in the notes blob.
//! - Provide a read-only ordered view for projections and UI callers.
//!
//! # Invariants
//! - Neither field is ever absent; empty strings are allowed.
//! - `NoteCollection` preserves insertion order exactly.
//! - Only crate code may mutate a `NoteCollection`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One user note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Note {
    /// Short headline shown in the list row.
    pub title: String,
    /// Free-form body text.
    pub content: String,
}

impl Note {
    /// Creates a note from any string-like pair.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Ordered sequence of notes; index order is display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteCollection {
    notes: Vec<Note>,
}

impl NoteCollection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Returns the note at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&Note> {
        self.notes.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Note> {
        self.notes.iter()
    }

    pub fn as_slice(&self) -> &[Note] {
        &self.notes
    }

    pub(crate) fn push(&mut self, note: Note) -> usize {
        self.notes.push(note);
        self.notes.len() - 1
    }

    pub(crate) fn replace(&mut self, index: usize, note: Note) -> Option<Note> {
        let slot = self.notes.get_mut(index)?;
        Some(std::mem::replace(slot, note))
    }

    pub(crate) fn remove(&mut self, index: usize) -> Option<Note> {
        if index < self.notes.len() {
            Some(self.notes.remove(index))
        } else {
            None
        }
    }
}

impl From<Vec<Note>> for NoteCollection {
    fn from(notes: Vec<Note>) -> Self {
        Self { notes }
    }
}

impl<'a> IntoIterator for &'a NoteCollection {
    type Item = &'a Note;
    type IntoIter = std::slice::Iter<'a, Note>;

    fn into_iter(self) -> Self::IntoIter {
        self.notes.iter()
    }
}

/// Input rejected by the caller-side validation contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteValidationError {
    /// Title and content are both blank.
    EmptyNote,
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyNote => write!(f, "note title and content must not both be empty"),
        }
    }
}

impl Error for NoteValidationError {}

/// Validates editor input before it reaches the store.
///
/// `NoteStore` accepts any string pair; request handlers call this first
/// so a note with nothing in it is never created.
pub fn validate_note_input(title: &str, content: &str) -> Result<(), NoteValidationError> {
    if title.trim().is_empty() && content.trim().is_empty() {
        return Err(NoteValidationError::EmptyNote);
    }
    Ok(())
}
