//! The note list screen's coordinator session.
//!
//! Translates [`NoteListStateEvent`]s into use-case jobs and runs them through
//! a [`DataChannelManager`]. The resulting view state lands in the
//! [`NoteListStore`]; messages queue up on the channel.

use std::sync::Arc;

use relay::{
    ChannelConfig, DataChannelManager, DataState, RelayError, StateEvent, Submission,
};
use tracing::info;

use crate::interactors::NoteListInteractors;
use crate::state::{NoteListStateEvent, NoteListStore, NoteListViewState};

pub struct NoteListSession {
    channel: DataChannelManager<NoteListViewState>,
    store: Arc<NoteListStore>,
    interactors: NoteListInteractors,
}

impl NoteListSession {
    pub fn new(interactors: NoteListInteractors, config: ChannelConfig) -> Self {
        let store = Arc::new(NoteListStore::new());
        Self {
            channel: DataChannelManager::new(store.clone(), config),
            store,
            interactors,
        }
    }

    /// Start (or restart) the session. Requires a tokio runtime.
    pub fn setup(&self) -> Result<(), RelayError> {
        self.channel.setup()?;
        info!("note list session started");
        Ok(())
    }

    /// Cancel everything in flight.
    pub fn teardown(&self) {
        self.channel.teardown();
        info!("note list session stopped");
    }

    /// Launch the job for `event`. Dropped if the same kind of event is still running.
    pub fn set_state_event(&self, event: NoteListStateEvent) -> Submission {
        let state_event: Arc<dyn StateEvent> = Arc::new(event.clone());
        let interactors = self.interactors.clone();

        self.channel
            .submit(state_event.clone(), move |publisher| async move {
                match event {
                    NoteListStateEvent::InsertNewNote { id, title } => {
                        interactors
                            .insert_new_note
                            .insert_new_note(id, &title, state_event, &publisher)
                            .await
                    }
                    NoteListStateEvent::UpdateNote { note } => {
                        interactors
                            .update_note
                            .update_note(&note, state_event, &publisher)
                            .await
                    }
                    NoteListStateEvent::DeleteNote { note } => {
                        interactors
                            .delete_note
                            .delete_note(&note, state_event, &publisher)
                            .await
                    }
                    NoteListStateEvent::RestoreDeletedNote { note } => {
                        interactors
                            .restore_deleted_note
                            .restore_deleted_note(&note, state_event, &publisher)
                            .await
                    }
                    NoteListStateEvent::SearchNotes {
                        query,
                        filter_and_order,
                        page,
                    } => {
                        interactors
                            .search_notes
                            .search_notes(&query, &filter_and_order, page, state_event, &publisher)
                            .await
                    }
                    NoteListStateEvent::GetNumNotesInCache => {
                        interactors
                            .get_num_notes
                            .get_num_notes(state_event, &publisher)
                            .await
                    }
                    NoteListStateEvent::CreateStateMessage { state_message } => {
                        publisher
                            .publish(DataState::new(None, Some(state_message), Some(state_event)))
                            .await;
                    }
                }
            })
    }

    /// The underlying coordinator, for messages and diagnostics.
    pub fn channel(&self) -> &DataChannelManager<NoteListViewState> {
        &self.channel
    }

    pub fn store(&self) -> &Arc<NoteListStore> {
        &self.store
    }

    pub fn view_state(&self) -> NoteListViewState {
        self.store.view_state()
    }
}

impl std::fmt::Debug for NoteListSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteListSession")
            .field("channel", &self.channel)
            .field("store", &self.store)
            .finish()
    }
}
