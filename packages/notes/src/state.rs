//! Note list screen state: events, view state and the store that applies it.

use std::borrow::Cow;
use std::sync::{Mutex, PoisonError};

use relay::{StateEvent, StateHandler, StateMessage};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::model::Note;

/// Everything the note list screen can ask for.
#[derive(Debug, Clone, PartialEq)]
pub enum NoteListStateEvent {
    InsertNewNote {
        id: Option<String>,
        title: String,
    },
    UpdateNote {
        note: Note,
    },
    DeleteNote {
        note: Note,
    },
    RestoreDeletedNote {
        note: Note,
    },
    SearchNotes {
        query: String,
        filter_and_order: String,
        page: i32,
    },
    GetNumNotesInCache,
    /// Show a message raised by the UI itself.
    CreateStateMessage {
        state_message: StateMessage,
    },
}

impl StateEvent for NoteListStateEvent {
    fn event_name(&self) -> Cow<'static, str> {
        match self {
            NoteListStateEvent::InsertNewNote { .. } => "InsertNewNoteEvent".into(),
            NoteListStateEvent::UpdateNote { .. } => "UpdateNoteEvent".into(),
            NoteListStateEvent::DeleteNote { .. } => "DeleteNoteEvent".into(),
            NoteListStateEvent::RestoreDeletedNote { .. } => "RestoreDeletedNoteEvent".into(),
            NoteListStateEvent::SearchNotes { .. } => "SearchNotesEvent".into(),
            NoteListStateEvent::GetNumNotesInCache => "GetNumNotesInCacheEvent".into(),
            NoteListStateEvent::CreateStateMessage { .. } => "CreateStateMessageEvent".into(),
        }
    }

    fn error_info(&self) -> String {
        match self {
            NoteListStateEvent::InsertNewNote { .. } => "Error inserting new note.",
            NoteListStateEvent::UpdateNote { .. } => "Error updating note.",
            NoteListStateEvent::DeleteNote { .. } => "Error deleting note.",
            NoteListStateEvent::RestoreDeletedNote { .. } => "Error restoring the deleted note.",
            NoteListStateEvent::SearchNotes { .. } => "Error getting list of notes.",
            NoteListStateEvent::GetNumNotesInCache => {
                "Error getting the number of notes from the cache."
            }
            NoteListStateEvent::CreateStateMessage { .. } => "Error creating a new state message.",
        }
        .to_string()
    }

    fn should_display_progress_bar(&self) -> bool {
        !matches!(self, NoteListStateEvent::CreateStateMessage { .. })
    }
}

/// A note removed from the list that can still be restored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePendingDelete {
    pub note: Note,
    pub list_position: Option<usize>,
}

/// View state of the note list screen.
///
/// Every field is optional: a payload only carries what changed, and the
/// store merges it into the current state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteListViewState {
    pub note_list: Option<Vec<Note>>,
    pub new_note: Option<Note>,
    pub note_pending_delete: Option<NotePendingDelete>,
    pub search_query: Option<String>,
    pub page: Option<u32>,
    pub filter_and_order: Option<String>,
    pub num_notes_in_cache: Option<usize>,
}

impl NoteListViewState {
    pub fn with_note_list(notes: Vec<Note>) -> Self {
        Self {
            note_list: Some(notes),
            ..Self::default()
        }
    }

    pub fn with_num_notes(count: usize) -> Self {
        Self {
            num_notes_in_cache: Some(count),
            ..Self::default()
        }
    }

    /// Overwrite fields that are set in `update`.
    pub fn merge(&mut self, update: NoteListViewState) {
        let NoteListViewState {
            note_list,
            new_note,
            note_pending_delete,
            search_query,
            page,
            filter_and_order,
            num_notes_in_cache,
        } = update;

        if note_list.is_some() {
            self.note_list = note_list;
        }
        if new_note.is_some() {
            self.new_note = new_note;
        }
        if note_pending_delete.is_some() {
            self.note_pending_delete = note_pending_delete;
        }
        if search_query.is_some() {
            self.search_query = search_query;
        }
        if page.is_some() {
            self.page = page;
        }
        if filter_and_order.is_some() {
            self.filter_and_order = filter_and_order;
        }
        if num_notes_in_cache.is_some() {
            self.num_notes_in_cache = num_notes_in_cache;
        }
    }
}

/// Holds the current [`NoteListViewState`] and applies incoming payloads.
pub struct NoteListStore {
    state: Mutex<NoteListViewState>,
    updates: watch::Sender<NoteListViewState>,
}

impl NoteListStore {
    pub fn new() -> Self {
        let (updates, _) = watch::channel(NoteListViewState::default());
        Self {
            state: Mutex::new(NoteListViewState::default()),
            updates,
        }
    }

    /// Snapshot of the current view state.
    pub fn view_state(&self) -> NoteListViewState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Watch the view state.
    pub fn subscribe(&self) -> watch::Receiver<NoteListViewState> {
        self.updates.subscribe()
    }
}

impl Default for NoteListStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateHandler<NoteListViewState> for NoteListStore {
    fn handle_new_data(&self, data: NoteListViewState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.merge(data);
        debug!(
            notes = state.note_list.as_ref().map(Vec::len),
            num_notes_in_cache = state.num_notes_in_cache,
            "note list state updated"
        );
        self.updates.send_replace(state.clone());
    }
}

impl std::fmt::Debug for NoteListStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteListStore")
            .field("state", &self.view_state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NoteFactory;

    #[test]
    fn test_identity_ignores_arguments() {
        let factory = NoteFactory::default();
        let a = NoteListStateEvent::DeleteNote {
            note: factory.create_single_note(None, "a", ""),
        };
        let b = NoteListStateEvent::DeleteNote {
            note: factory.create_single_note(None, "b", ""),
        };

        assert_eq!(a.event_name(), b.event_name());
        assert_ne!(a.event_name(), NoteListStateEvent::GetNumNotesInCache.event_name());
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let store = NoteListStore::new();
        let notes = NoteFactory::default().create_note_list(2);

        store.handle_new_data(NoteListViewState::with_note_list(notes.clone()));
        store.handle_new_data(NoteListViewState::with_num_notes(9));

        let state = store.view_state();
        assert_eq!(state.note_list, Some(notes));
        assert_eq!(state.num_notes_in_cache, Some(9));
    }

    #[test]
    fn test_subscribers_see_updates() {
        let store = NoteListStore::new();
        let rx = store.subscribe();

        store.handle_new_data(NoteListViewState::with_num_notes(3));
        assert_eq!(rx.borrow().num_notes_in_cache, Some(3));
    }

    #[test]
    fn test_state_message_event_hides_progress() {
        let event = NoteListStateEvent::CreateStateMessage {
            state_message: StateMessage::new(relay::Response::success(
                "hi",
                relay::UiComponentType::Toast,
            )),
        };
        assert!(!event.should_display_progress_bar());
        assert!(NoteListStateEvent::GetNumNotesInCache.should_display_progress_bar());
    }
}
