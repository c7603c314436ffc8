//! Note request handler for the UI host.
//!
//! # Responsibility
//! - Map `create/edit/delete` requests 1:1 onto `NoteStore` operations.
//! - Emit one `ListChange` per applied mutation and one `NoteCreated` per
//!   successful create, in mutation order.
//! - Drive the editor round trip (open prefilled editor, apply its result).
//!
//! # Invariants
//! - Events are emitted only after the in-memory mutation is applied.
//! - A persistence failure still emits the `ListChange` (the session keeps
//!   the mutation) but never `NoteCreated`; the error is returned.
//! - Input validation is the caller's job; see `validate_note_input`.

use crate::model::note::Note;
use crate::repo::kv_repo::KeyValueRepository;
use crate::repo::note_store::{NoteStore, NoteStoreError, NoteStoreResult};
use crate::service::list_projection::{ListChange, ListProjection, RowAction};
use log::{info, warn};
use serde::Serialize;

/// Payload handed to the notification collaborator after a create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteCreated {
    pub title: String,
    pub content: String,
}

/// Outbound event stream item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NoteEvent {
    ListChanged { change: ListChange },
    NoteCreated(NoteCreated),
}

/// Receiver of outbound note events.
pub trait NoteEventSink {
    fn emit(&mut self, event: NoteEvent);
}

impl NoteEventSink for Vec<NoteEvent> {
    fn emit(&mut self, event: NoteEvent) {
        self.push(event);
    }
}

/// Editor screen input: `position == None` means "new note".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorRequest {
    pub position: Option<usize>,
    pub title: String,
    pub content: String,
}

/// Editor screen output, routed back through `apply_editor_result`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorResult {
    pub position: Option<usize>,
    pub title: String,
    pub content: String,
}

/// What a row action resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowActionOutcome {
    OpenEditor(EditorRequest),
    Deleted(Note),
}

/// Request handler owning the store and the outbound event sink.
pub struct NoteService<R: KeyValueRepository, S: NoteEventSink> {
    store: NoteStore<R>,
    sink: S,
}

impl<R: KeyValueRepository, S: NoteEventSink> NoteService<R, S> {
    pub fn new(store: NoteStore<R>, sink: S) -> Self {
        Self { store, sink }
    }

    /// Appends a note. Returns its index.
    pub fn create_note(
        &mut self,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> NoteStoreResult<usize> {
        let title = title.into();
        let content = content.into();
        let index = self.store.len();
        let result = self.store.append(title.clone(), content.clone());
        let index = self.finish(result, ListProjection::on_appended(index))?;

        self.sink
            .emit(NoteEvent::NoteCreated(NoteCreated { title, content }));
        info!("event=note_create module=service status=ok index={index}");
        Ok(index)
    }

    /// Overwrites the note at `index`.
    pub fn edit_note(
        &mut self,
        index: usize,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> NoteStoreResult<()> {
        let result = self.store.replace(index, title, content);
        self.finish(result, ListProjection::on_replaced(index))?;
        info!("event=note_edit module=service status=ok index={index}");
        Ok(())
    }

    /// Removes the note at `index`. Returns the removed note.
    pub fn delete_note(&mut self, index: usize) -> NoteStoreResult<Note> {
        let result = self.store.remove_at(index);
        let removed = self.finish(result, ListProjection::on_removed(index))?;
        info!("event=note_delete module=service status=ok index={index}");
        Ok(removed)
    }

    /// Editor request for a brand-new note.
    pub fn begin_create(&self) -> EditorRequest {
        EditorRequest::default()
    }

    /// Editor request prefilled with the note at `index`.
    pub fn begin_edit(&self, index: usize) -> NoteStoreResult<EditorRequest> {
        let note = self.store.get(index).ok_or_else(|| {
            NoteStoreError::IndexOutOfRange {
                index: i64::try_from(index).unwrap_or(i64::MAX),
                len: self.store.len(),
            }
        })?;
        Ok(EditorRequest {
            position: Some(index),
            title: note.title.clone(),
            content: note.content.clone(),
        })
    }

    /// Routes an editor result to create or edit. Returns the affected index.
    pub fn apply_editor_result(&mut self, result: EditorResult) -> NoteStoreResult<usize> {
        match result.position {
            None => self.create_note(result.title, result.content),
            Some(index) => {
                self.edit_note(index, result.title, result.content)?;
                Ok(index)
            }
        }
    }

    /// Handles a row context action.
    pub fn on_row_action(
        &mut self,
        index: usize,
        action: RowAction,
    ) -> NoteStoreResult<RowActionOutcome> {
        match action {
            RowAction::Edit => self.begin_edit(index).map(RowActionOutcome::OpenEditor),
            RowAction::Delete => self.delete_note(index).map(RowActionOutcome::Deleted),
        }
    }

    /// Retries persisting after an earlier write failure.
    pub fn retry_persist(&mut self) -> NoteStoreResult<()> {
        self.store.persist()
    }

    pub fn projection(&self) -> ListProjection<'_> {
        ListProjection::new(self.store.notes())
    }

    pub fn store(&self) -> &NoteStore<R> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut NoteStore<R> {
        &mut self.store
    }

    fn finish<T>(&mut self, result: NoteStoreResult<T>, change: ListChange) -> NoteStoreResult<T> {
        match result {
            Ok(value) => {
                self.sink.emit(NoteEvent::ListChanged { change });
                Ok(value)
            }
            Err(NoteStoreError::Persistence(err)) => {
                warn!(
                    "event=note_mutation module=service status=unsaved index={} error={}",
                    change.index(),
                    err
                );
                self.sink.emit(NoteEvent::ListChanged { change });
                Err(NoteStoreError::Persistence(err))
            }
            Err(other) => Err(other),
        }
    }
}

impl<R: KeyValueRepository> NoteService<R, Vec<NoteEvent>> {
    /// Takes all buffered events, oldest first.
    pub fn drain_events(&mut self) -> Vec<NoteEvent> {
        std::mem::take(&mut self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::{EditorResult, NoteEvent, NoteService, RowActionOutcome};
    use crate::model::note::Note;
    use crate::repo::kv_repo::InMemoryKeyValueRepository;
    use crate::repo::note_store::{NoteStore, NoteStoreError};
    use crate::service::list_projection::{ListChange, RowAction};

    fn service() -> NoteService<InMemoryKeyValueRepository, Vec<NoteEvent>> {
        let store = NoteStore::open(InMemoryKeyValueRepository::new(), "notes").unwrap();
        NoteService::new(store, Vec::new())
    }

    #[test]
    fn editor_result_without_position_creates() {
        let mut service = service();
        let index = service
            .apply_editor_result(EditorResult {
                position: None,
                title: "t".to_string(),
                content: "c".to_string(),
            })
            .unwrap();
        assert_eq!(index, 0);

        let index = service
            .apply_editor_result(EditorResult {
                position: Some(0),
                title: "t2".to_string(),
                content: "c2".to_string(),
            })
            .unwrap();
        assert_eq!(index, 0);
        assert_eq!(service.store().get(0), Some(&Note::new("t2", "c2")));

        let events = service.drain_events();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[2],
            NoteEvent::ListChanged {
                change: ListChange::Update(0)
            }
        );
        assert!(service.drain_events().is_empty());
    }

    #[test]
    fn row_actions_open_editor_or_delete() {
        let mut service = service();
        service.create_note("A", "1").unwrap();
        service.drain_events();

        let outcome = service.on_row_action(0, RowAction::Edit).unwrap();
        match outcome {
            RowActionOutcome::OpenEditor(request) => {
                assert_eq!(request.position, Some(0));
                assert_eq!(request.title, "A");
                assert_eq!(request.content, "1");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(service.drain_events().is_empty());

        let outcome = service.on_row_action(0, RowAction::Delete).unwrap();
        assert_eq!(outcome, RowActionOutcome::Deleted(Note::new("A", "1")));
        assert_eq!(
            service.drain_events(),
            vec![NoteEvent::ListChanged {
                change: ListChange::Remove(0)
            }]
        );
    }

    #[test]
    fn begin_edit_on_stale_position_fails() {
        let service = service();
        let err = service.begin_edit(0).unwrap_err();
        assert!(matches!(
            err,
            NoteStoreError::IndexOutOfRange { index: 0, len: 0 }
        ));
        assert_eq!(service.begin_create().position, None);
    }
}
