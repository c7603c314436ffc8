//! Use-case layer between the UI host and the note store.
//!
//! # Responsibility
//! - Turn UI requests into store mutations plus outbound events.
//! - Keep the display surface in sync through positional list changes.

pub mod list_projection;
pub mod note_service;
