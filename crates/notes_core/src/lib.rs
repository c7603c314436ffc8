//! Core state management for a single-device notes app.
//! Owns the ordered note list, its durable blob and the list change stream
//! consumed by the UI host.

pub mod codec;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod service;

pub use codec::{decode_notes, encode_notes, CorruptStoreError};
pub use config::{open_sqlite_session, NotesConfig, OpenedSession, SqliteNoteService};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::note::{validate_note_input, Note, NoteCollection, NoteValidationError};
pub use notify::{
    build_notification, parse_notification_permission, NotificationPermission,
    NotificationRequest,
};
pub use repo::file_repo::FileKeyValueRepository;
pub use repo::kv_repo::{
    InMemoryKeyValueRepository, KeyValueRepository, SqliteKeyValueRepository, StorageError,
    StorageResult,
};
pub use repo::note_store::{NoteStore, NoteStoreError, NoteStoreResult, PersistenceError};
pub use service::list_projection::{ListChange, ListProjection, NoteRow, RowAction};
pub use service::note_service::{
    EditorRequest, EditorResult, NoteCreated, NoteEvent, NoteEventSink, NoteService,
    RowActionOutcome,
};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
