//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the note list requests (`create/edit/delete`) to the UI host.
//! - Hand back the positional list changes and the note-created payload
//!   produced by each request.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - One process-wide session; calls are serialized through its lock.
//! - Empty title-and-content input is rejected on create, before the store.
//! - A corrupt-store warning stays pending in the session until it has been
//!   placed in a response `warning` field, whatever that call's outcome.

use log::warn;
use notes_core::{
    build_notification, core_version as core_version_inner,
    default_log_level as default_log_level_inner, init_logging as init_logging_inner,
    open_sqlite_session, parse_notification_permission, ping as ping_inner, validate_note_input,
    ListChange, NoteCreated, NoteEvent, NoteStoreError, NotesConfig, SqliteNoteService,
};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

static SESSION: Mutex<Option<Session>> = Mutex::new(None);
static DB_PATH_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

struct Session {
    service: SqliteNoteService,
    pending_warning: Option<String>,
}

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Log level the host should pass to `init_logging` by default.
#[flutter_rust_bridge::frb(sync)]
pub fn default_log_level() -> String {
    default_log_level_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - Returns empty string on success and error message on failure.
/// - Safe to repeat with the same `level + log_dir`.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Points the session at another database file and closes the current one.
///
/// # FFI contract
/// - Returns empty string on success and error message on failure.
/// - The next notes call reopens from `db_path`.
#[flutter_rust_bridge::frb(sync)]
pub fn configure_notes_db_path(db_path: String) -> String {
    let trimmed = db_path.trim();
    if trimmed.is_empty() {
        return "db_path cannot be empty".to_string();
    }

    let mut session = lock(&SESSION);
    *lock(&DB_PATH_OVERRIDE) = Some(PathBuf::from(trimmed));
    *session = None;
    String::new()
}

/// One list row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteItem {
    pub index: i64,
    pub title: String,
    pub content: String,
}

/// Positional display update (`insert|update|remove`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListChangeItem {
    pub kind: String,
    pub index: i64,
}

/// Full list envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesListResponse {
    pub ok: bool,
    pub items: Vec<NoteItem>,
    pub message: String,
    /// Data-loss warning after a corrupt store, empty otherwise.
    pub warning: String,
}

/// Envelope for one create/edit/delete request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteActionResponse {
    pub ok: bool,
    /// Affected position on success.
    pub index: Option<i64>,
    /// Display updates to apply, in order. Present on write failures too.
    pub changes: Vec<ListChangeItem>,
    /// Set after a create; forward to `note_notification`.
    pub created: Option<NoteItem>,
    /// True while the last write has not reached storage.
    pub has_unsaved_changes: bool,
    pub message: String,
    /// Data-loss warning after a corrupt store, empty otherwise.
    pub warning: String,
}

/// Notification the host should post, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteNotificationResponse {
    pub should_post: bool,
    pub channel_id: String,
    pub title: String,
    pub text: String,
    pub message: String,
}

/// Returns all notes, opening the session on first use.
#[flutter_rust_bridge::frb(sync)]
pub fn notes_list() -> NotesListResponse {
    match with_session(|service| {
        service
            .projection()
            .rows()
            .map(|row| NoteItem {
                index: to_ffi_index(row.index),
                title: row.title.to_string(),
                content: row.content.to_string(),
            })
            .collect::<Vec<_>>()
    }) {
        Ok((items, warning)) => NotesListResponse {
            ok: true,
            items,
            message: String::new(),
            warning: warning.unwrap_or_default(),
        },
        Err(err) => NotesListResponse {
            ok: false,
            items: Vec::new(),
            message: format!("notes_list failed: {err}"),
            warning: String::new(),
        },
    }
}

/// Creates a note at the end of the list.
#[flutter_rust_bridge::frb(sync)]
pub fn note_create(title: String, content: String) -> NoteActionResponse {
    if let Err(err) = validate_note_input(&title, &content) {
        return NoteActionResponse::failure(format!("note_create rejected: {err}"));
    }
    run_action("note_create", |service| {
        service.create_note(title, content).map(to_ffi_index)
    })
}

/// Replaces the note at `index`.
#[flutter_rust_bridge::frb(sync)]
pub fn note_edit(index: i64, title: String, content: String) -> NoteActionResponse {
    run_action("note_edit", |service| {
        let position = service.store().resolve_position(index)?;
        service.edit_note(position, title, content)?;
        Ok(index)
    })
}

/// Deletes the note at `index`.
#[flutter_rust_bridge::frb(sync)]
pub fn note_delete(index: i64) -> NoteActionResponse {
    run_action("note_delete", |service| {
        let position = service.store().resolve_position(index)?;
        service.delete_note(position)?;
        Ok(index)
    })
}

/// Retries writing the list after an earlier storage failure.
#[flutter_rust_bridge::frb(sync)]
pub fn notes_retry_persist() -> NoteActionResponse {
    run_action("notes_retry_persist", |service| {
        service.retry_persist()?;
        Ok(to_ffi_index(service.store().len()))
    })
}

/// Builds the "note created" notification for the current permission state.
///
/// `permission` is one of `granted|denied|not_required`.
#[flutter_rust_bridge::frb(sync)]
pub fn note_notification(
    title: String,
    content: String,
    permission: String,
) -> NoteNotificationResponse {
    let permission = match parse_notification_permission(&permission) {
        Ok(permission) => permission,
        Err(err) => return NoteNotificationResponse::skipped(err.to_string()),
    };
    let event = NoteCreated { title, content };
    match build_notification(&event, permission) {
        Some(request) => NoteNotificationResponse {
            should_post: true,
            channel_id: request.channel_id.to_string(),
            title: request.title,
            text: request.text,
            message: String::new(),
        },
        None => NoteNotificationResponse::skipped("notification permission denied".to_string()),
    }
}

impl NoteActionResponse {
    fn failure(message: String) -> Self {
        Self {
            ok: false,
            index: None,
            changes: Vec::new(),
            created: None,
            has_unsaved_changes: false,
            message,
            warning: String::new(),
        }
    }
}

impl NoteNotificationResponse {
    fn skipped(message: String) -> Self {
        Self {
            should_post: false,
            channel_id: String::new(),
            title: String::new(),
            text: String::new(),
            message,
        }
    }
}

fn run_action(
    name: &str,
    action: impl FnOnce(&mut SqliteNoteService) -> Result<i64, NoteStoreError>,
) -> NoteActionResponse {
    let outcome = with_session(|service| {
        let result = action(service);
        let events = service.drain_events();
        (result, events, service.store().has_unsaved_changes())
    });

    let ((result, events, has_unsaved_changes), warning) = match outcome {
        Ok(outcome) => outcome,
        Err(err) => return NoteActionResponse::failure(format!("{name} failed: {err}")),
    };

    let mut response = NoteActionResponse::failure(String::new());
    response.has_unsaved_changes = has_unsaved_changes;
    response.warning = warning.unwrap_or_default();
    for event in events {
        match event {
            NoteEvent::ListChanged { change } => response.changes.push(to_change_item(change)),
            NoteEvent::NoteCreated(created) => {
                response.created = Some(NoteItem {
                    index: response.changes.last().map_or(-1, |change| change.index),
                    title: created.title,
                    content: created.content,
                });
            }
        }
    }

    match result {
        Ok(index) => {
            response.ok = true;
            response.index = Some(index);
        }
        Err(err) => {
            warn!("event=ffi_action module=ffi status=error action={name} error={err}");
            response.message = format!("{name} failed: {err}");
        }
    }
    response
}

/// Runs `f` against the session, opening it first when needed.
///
/// Also hands out the pending corrupt-store warning; the caller must put it
/// in its response.
fn with_session<T>(
    f: impl FnOnce(&mut SqliteNoteService) -> T,
) -> Result<(T, Option<String>), String> {
    let mut guard = lock(&SESSION);
    if guard.is_none() {
        let opened = open_sqlite_session(&resolve_config()).map_err(|err| err.to_string())?;
        let pending_warning = opened.recovered.map(|err| {
            format!("Saved notes could not be read and were moved to a backup; starting empty. ({err})")
        });
        *guard = Some(Session {
            service: opened.service,
            pending_warning,
        });
    }

    match guard.as_mut() {
        Some(session) => {
            let value = f(&mut session.service);
            Ok((value, session.pending_warning.take()))
        }
        None => Err("notes session unavailable".to_string()),
    }
}

fn resolve_config() -> NotesConfig {
    match lock(&DB_PATH_OVERRIDE).clone() {
        Some(path) => NotesConfig::with_db_path(path),
        None => NotesConfig::from_env(),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn to_change_item(change: ListChange) -> ListChangeItem {
    let kind = match change {
        ListChange::Insert(_) => "insert",
        ListChange::Update(_) => "update",
        ListChange::Remove(_) => "remove",
    };
    ListChangeItem {
        kind: kind.to_string(),
        index: to_ffi_index(change.index()),
    }
}

fn to_ffi_index(index: usize) -> i64 {
    i64::try_from(index).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::{
        configure_notes_db_path, core_version, default_log_level, init_logging, note_create,
        note_delete, note_edit, note_notification, notes_list, notes_retry_persist, ping,
        ListChangeItem,
    };
    use std::path::Path;
    use std::sync::{Mutex, MutexGuard};
    use tempfile::TempDir;

    static TEST_LOCK: Mutex<()> = Mutex::new(());

    struct Fixture {
        _guard: MutexGuard<'static, ()>,
        dir: TempDir,
    }

    fn fresh_session() -> Fixture {
        let guard = TEST_LOCK.lock().unwrap_or_else(|err| err.into_inner());
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("notes.sqlite3");
        let error = configure_notes_db_path(path.to_str().expect("utf-8 path").to_string());
        assert!(error.is_empty(), "{error}");
        Fixture { _guard: guard, dir }
    }

    fn open_corrupt_database(dir: &Path) {
        let path = dir.join("corrupt.sqlite3");
        {
            let conn = notes_core::db::open_db(&path).expect("open db");
            conn.execute(
                "INSERT INTO kv_slots (key, value) VALUES ('notes', '{broken');",
                [],
            )
            .expect("seed corrupt slot");
        }
        let error = configure_notes_db_path(path.to_str().expect("utf-8 path").to_string());
        assert!(error.is_empty(), "{error}");
    }

    fn change(kind: &str, index: i64) -> ListChangeItem {
        ListChangeItem {
            kind: kind.to_string(),
            index,
        }
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn default_log_level_follows_build_profile() {
        let expected = if cfg!(debug_assertions) { "debug" } else { "info" };
        assert_eq!(default_log_level(), expected);
    }

    #[test]
    fn init_logging_rejects_bad_input() {
        assert!(!init_logging("info".to_string(), String::new()).is_empty());
        assert!(!init_logging("verbose".to_string(), "/tmp/logs".to_string()).is_empty());
    }

    #[test]
    fn configure_rejects_blank_path() {
        assert!(!configure_notes_db_path("  ".to_string()).is_empty());
    }

    #[test]
    fn create_returns_insert_change_and_created_payload() {
        let _fixture = fresh_session();

        let response = note_create("Groceries".to_string(), "Milk, eggs".to_string());
        assert!(response.ok, "{}", response.message);
        assert_eq!(response.index, Some(0));
        assert_eq!(response.changes, vec![change("insert", 0)]);
        let created = response.created.expect("created payload");
        assert_eq!(created.title, "Groceries");
        assert_eq!(created.index, 0);
        assert!(!response.has_unsaved_changes);

        let listed = notes_list();
        assert!(listed.ok, "{}", listed.message);
        assert_eq!(listed.items.len(), 1);
    }

    #[test]
    fn edit_and_delete_report_positional_changes() {
        let _fixture = fresh_session();
        assert!(note_create("A".to_string(), "1".to_string()).ok);
        assert!(note_create("B".to_string(), "2".to_string()).ok);
        assert!(note_create("C".to_string(), "3".to_string()).ok);

        let edited = note_edit(0, "A2".to_string(), "1b".to_string());
        assert!(edited.ok, "{}", edited.message);
        assert_eq!(edited.changes, vec![change("update", 0)]);
        assert!(edited.created.is_none());

        let deleted = note_delete(1);
        assert!(deleted.ok, "{}", deleted.message);
        assert_eq!(deleted.changes, vec![change("remove", 1)]);

        let titles: Vec<String> = notes_list()
            .items
            .into_iter()
            .map(|item| item.title)
            .collect();
        assert_eq!(titles, vec!["A2".to_string(), "C".to_string()]);
    }

    #[test]
    fn invalid_requests_are_rejected_without_changes() {
        let _fixture = fresh_session();

        let blank = note_create("  ".to_string(), String::new());
        assert!(!blank.ok);
        assert!(blank.message.contains("must not both be empty"));

        let negative = note_delete(-1);
        assert!(!negative.ok);
        assert!(negative.message.contains("out of range"));
        assert!(negative.changes.is_empty());

        let past_end = note_edit(3, "x".to_string(), "y".to_string());
        assert!(!past_end.ok);
        assert!(notes_list().items.is_empty());
    }

    #[test]
    fn edit_accepts_blank_title_and_content() {
        let _fixture = fresh_session();
        assert!(note_create("A".to_string(), "1".to_string()).ok);

        let edited = note_edit(0, String::new(), String::new());
        assert!(edited.ok, "{}", edited.message);
        assert_eq!(edited.changes, vec![change("update", 0)]);
        assert_eq!(notes_list().items[0].title, "");
    }

    #[test]
    fn corrupt_database_slot_starts_empty_with_warning() {
        let fixture = fresh_session();
        open_corrupt_database(fixture.dir.path());

        let listed = notes_list();
        assert!(listed.ok);
        assert!(listed.items.is_empty());
        assert!(listed.message.is_empty());
        assert!(listed.warning.contains("backup"), "{}", listed.warning);

        let retried = notes_retry_persist();
        assert!(retried.ok, "{}", retried.message);
        assert!(retried.warning.is_empty());
    }

    #[test]
    fn corrupt_warning_reaches_a_failing_first_call() {
        let fixture = fresh_session();
        open_corrupt_database(fixture.dir.path());

        let deleted = note_delete(0);
        assert!(!deleted.ok);
        assert!(deleted.message.contains("out of range"), "{}", deleted.message);
        assert!(deleted.warning.contains("backup"), "{}", deleted.warning);

        let listed = notes_list();
        assert!(listed.ok);
        assert!(listed.warning.is_empty());
    }

    #[test]
    fn notification_respects_permission_state() {
        let granted = note_notification(
            "Groceries".to_string(),
            "Milk, eggs".to_string(),
            "granted".to_string(),
        );
        assert!(granted.should_post);
        assert_eq!(granted.channel_id, "notes_channel");
        assert_eq!(granted.title, "New note: Groceries");

        let denied = note_notification("t".to_string(), "c".to_string(), "denied".to_string());
        assert!(!denied.should_post);

        let bogus = note_notification("t".to_string(), "c".to_string(), "maybe".to_string());
        assert!(!bogus.should_post);
        assert!(bogus.message.contains("unsupported"));
    }
}
