//! Read-through list view and positional change events.
//!
//! # Responsibility
//! - Map the note collection to renderable rows.
//! - Translate store mutations into single-row display updates.
//!
//! # Invariants
//! - One mutation maps to exactly one `ListChange`; a full redraw is never
//!   requested for a single-row edit.
//! - The projection holds no state beyond a borrow of the collection.

use crate::model::note::{Note, NoteCollection};
use serde::Serialize;

/// Positional update instruction for a display surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum ListChange {
    /// A row appeared at `index`.
    Insert(usize),
    /// The row at `index` changed content.
    Update(usize),
    /// The row at `index` disappeared; later rows shift up by one.
    Remove(usize),
}

impl ListChange {
    pub fn index(&self) -> usize {
        match *self {
            Self::Insert(index) | Self::Update(index) | Self::Remove(index) => index,
        }
    }
}

/// Per-row context action offered by the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Edit,
    Delete,
}

/// One renderable list row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteRow<'a> {
    pub index: usize,
    pub title: &'a str,
    pub content: &'a str,
}

impl<'a> NoteRow<'a> {
    fn from_note(index: usize, note: &'a Note) -> Self {
        Self {
            index,
            title: note.title.as_str(),
            content: note.content.as_str(),
        }
    }
}

/// Borrowing list adapter over the current collection.
#[derive(Debug, Clone, Copy)]
pub struct ListProjection<'a> {
    notes: &'a NoteCollection,
}

impl<'a> ListProjection<'a> {
    pub fn new(notes: &'a NoteCollection) -> Self {
        Self { notes }
    }

    pub fn item_count(&self) -> usize {
        self.notes.len()
    }

    /// Row at `index`, `None` past the end.
    pub fn row(&self, index: usize) -> Option<NoteRow<'a>> {
        self.notes
            .get(index)
            .map(|note| NoteRow::from_note(index, note))
    }

    /// All rows in display order.
    pub fn rows(&self) -> impl Iterator<Item = NoteRow<'a>> + 'a {
        self.notes
            .iter()
            .enumerate()
            .map(|(index, note)| NoteRow::from_note(index, note))
    }

    pub fn on_appended(index: usize) -> ListChange {
        ListChange::Insert(index)
    }

    pub fn on_replaced(index: usize) -> ListChange {
        ListChange::Update(index)
    }

    pub fn on_removed(index: usize) -> ListChange {
        ListChange::Remove(index)
    }
}
