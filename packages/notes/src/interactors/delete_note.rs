use std::marker::PhantomData;
use std::sync::Arc;

use relay::{
    safe_cache_call, CallResult, DataState, Publisher, Response, ResponseHandler, StateEvent,
    UiComponentType,
};
use tracing::debug;

use super::sync_network;
use crate::cache::NoteCacheDataSource;
use crate::config::CallTimeouts;
use crate::model::Note;
use crate::network::NoteNetworkDataSource;

pub const DELETE_NOTE_SUCCESS: &str = "Successfully deleted the note";
pub const DELETE_NOTE_FAILURE: &str = "Failed to delete the note";

/// Deletes a note from the cache, then moves it to the backend's tombstones.
///
/// Generic over the view state: deleting never produces a payload, so any
/// screen can use it.
pub struct DeleteNote<V> {
    cache: Arc<dyn NoteCacheDataSource>,
    network: Arc<dyn NoteNetworkDataSource>,
    timeouts: CallTimeouts,
    _view_state: PhantomData<fn() -> V>,
}

impl<V: Send + 'static> DeleteNote<V> {
    pub fn new(
        cache: Arc<dyn NoteCacheDataSource>,
        network: Arc<dyn NoteNetworkDataSource>,
        timeouts: CallTimeouts,
    ) -> Self {
        Self {
            cache,
            network,
            timeouts,
            _view_state: PhantomData,
        }
    }

    pub async fn delete_note(
        &self,
        note: &Note,
        state_event: Arc<dyn StateEvent>,
        publisher: &Publisher<V>,
    ) {
        debug!(note_id = %note.id, "deleting note");
        let result = safe_cache_call(self.timeouts.cache, self.cache.delete_note(&note.id)).await;
        let deleted = matches!(&result, CallResult::Success(Some(rows)) if *rows > 0);

        let state = ResponseHandler::cache(state_event.clone()).handle(result, |rows| {
            if rows > 0 {
                DataState::data(
                    Some(Response::success(DELETE_NOTE_SUCCESS, UiComponentType::None)),
                    None,
                    Some(state_event.clone()),
                )
            } else {
                DataState::data(
                    Some(Response::error(DELETE_NOTE_FAILURE, UiComponentType::Toast)),
                    None,
                    Some(state_event.clone()),
                )
            }
        });
        publisher.publish(state).await;

        if deleted {
            let timeout = self.timeouts.network;
            sync_network(timeout, "delete_note", self.network.delete_note(&note.id)).await;
            sync_network(
                timeout,
                "insert_deleted_note",
                self.network.insert_deleted_note(note),
            )
            .await;
        }
    }
}
