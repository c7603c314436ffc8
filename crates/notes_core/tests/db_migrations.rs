use notes_core::db::migrations::{latest_version, schema_version};
use notes_core::db::{open_db, open_db_in_memory, DbError};
use notes_core::{
    open_sqlite_session, KeyValueRepository, Note, NoteStore, NoteStoreError, NotesConfig,
    SqliteKeyValueRepository, StorageError,
};
use rusqlite::Connection;

#[test]
fn fresh_database_stamps_slot_writes() {
    let conn = open_db_in_memory().unwrap();
    assert_eq!(schema_version(&conn).unwrap(), latest_version());

    let mut repo = SqliteKeyValueRepository::try_new(conn).unwrap();
    repo.put("notes", "[]").unwrap();

    let updated_at: i64 = repo
        .connection()
        .query_row(
            "SELECT updated_at FROM kv_slots WHERE key = 'notes';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(updated_at > 0);
}

#[test]
fn notes_blob_survives_reopen_without_remigrating() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.db");
    {
        let repo = SqliteKeyValueRepository::open(&path).unwrap();
        let mut store = NoteStore::open(repo, "notes").unwrap();
        store.append("Groceries", "Milk, eggs").unwrap();
        store.append("Todo", "Call mom").unwrap();
    }

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    let repo = SqliteKeyValueRepository::try_new(conn).unwrap();
    let store = NoteStore::open(repo, "notes").unwrap();
    assert_eq!(
        store.notes().as_slice(),
        &[
            Note::new("Groceries", "Milk, eggs"),
            Note::new("Todo", "Call mom")
        ]
    );
}

#[test]
fn unversioned_database_keeps_existing_slot_through_migration() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.db");
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE kv_slots (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL DEFAULT 0
            );
            INSERT INTO kv_slots (key, value)
            VALUES ('notes', '[{\"title\":\"kept\",\"content\":\"body\"}]');",
        )
        .unwrap();
    }

    let repo = SqliteKeyValueRepository::open(&path).unwrap();
    assert_eq!(schema_version(repo.connection()).unwrap(), latest_version());
    let store = NoteStore::open(repo, "notes").unwrap();
    assert_eq!(store.notes().as_slice(), &[Note::new("kept", "body")]);
}

#[test]
fn newer_schema_is_rejected_before_notes_are_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    }

    match SqliteKeyValueRepository::open(&path).err().unwrap() {
        StorageError::Db(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        }) => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = open_sqlite_session(&NotesConfig::with_db_path(&path))
        .err()
        .unwrap();
    match err {
        NoteStoreError::Persistence(err) => assert_eq!(err.operation(), "read"),
        other => panic!("unexpected error: {other}"),
    }
}
