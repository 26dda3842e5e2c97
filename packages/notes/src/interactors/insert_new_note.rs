use std::sync::Arc;

use relay::{
    safe_cache_call, CallResult, DataState, Publisher, Response, ResponseHandler, StateEvent,
    UiComponentType,
};
use tracing::debug;

use super::sync_network;
use crate::cache::NoteCacheDataSource;
use crate::config::CallTimeouts;
use crate::model::NoteFactory;
use crate::network::NoteNetworkDataSource;
use crate::state::NoteListViewState;

pub const INSERT_NOTE_SUCCESS: &str = "Successfully inserted new note.";
pub const INSERT_NOTE_FAILED: &str = "Failed to insert new note.";

/// Creates an empty-bodied note, stores it and pushes it to the backend.
pub struct InsertNewNote {
    cache: Arc<dyn NoteCacheDataSource>,
    network: Arc<dyn NoteNetworkDataSource>,
    factory: NoteFactory,
    timeouts: CallTimeouts,
}

impl InsertNewNote {
    pub fn new(
        cache: Arc<dyn NoteCacheDataSource>,
        network: Arc<dyn NoteNetworkDataSource>,
        factory: NoteFactory,
        timeouts: CallTimeouts,
    ) -> Self {
        Self {
            cache,
            network,
            factory,
            timeouts,
        }
    }

    pub async fn insert_new_note(
        &self,
        id: Option<String>,
        title: &str,
        state_event: Arc<dyn StateEvent>,
        publisher: &Publisher<NoteListViewState>,
    ) {
        let new_note = self.factory.create_single_note(id, title, "");
        debug!(note_id = %new_note.id, "inserting note");

        let result =
            safe_cache_call(self.timeouts.cache, self.cache.insert_note(new_note.clone())).await;
        let inserted = matches!(&result, CallResult::Success(Some(row)) if *row > 0);

        let state = ResponseHandler::cache(state_event.clone()).handle(result, |row| {
            if row > 0 {
                DataState::data(
                    Some(Response::success(INSERT_NOTE_SUCCESS, UiComponentType::Toast)),
                    Some(NoteListViewState {
                        new_note: Some(new_note.clone()),
                        ..NoteListViewState::default()
                    }),
                    Some(state_event.clone()),
                )
            } else {
                DataState::data(
                    Some(Response::error(INSERT_NOTE_FAILED, UiComponentType::Toast)),
                    None,
                    Some(state_event.clone()),
                )
            }
        });
        publisher.publish(state).await;

        if inserted {
            sync_network(
                self.timeouts.network,
                "insert_or_update_note",
                self.network.insert_or_update_note(&new_note),
            )
            .await;
        }
    }
}
