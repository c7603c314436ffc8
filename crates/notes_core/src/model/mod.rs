//! Domain model for the note list.
//!
//! # Responsibility
//! - Define the `Note` value record and the ordered `NoteCollection`.
//! - Own the caller-side input validation contract.
//!
//! # Invariants
//! - Note identity is positional: a note is addressed by its offset in
//!   `NoteCollection` for the lifetime of a session.
//! - Insertion order is display order; collections are never re-sorted.

pub mod note;
