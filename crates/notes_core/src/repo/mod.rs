//! Durable storage layer for the notes blob.
//!
//! # Responsibility
//! - Define the single key-value slot contract the note store writes to.
//! - Provide in-memory, file and SQLite backends for it.
//! - Own `NoteStore`, the single source of truth for the note collection.
//!
//! # Invariants
//! - `put` replaces a slot atomically: readers observe the old value or the
//!   new one, never a partial write.
//! - A `get` issued after a successful `put` observes that write.

pub mod file_repo;
pub mod kv_repo;
pub mod note_store;
