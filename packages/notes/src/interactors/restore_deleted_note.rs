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
use crate::state::{NoteListViewState, NotePendingDelete};

pub const RESTORE_NOTE_SUCCESS: &str = "Successfully restored the deleted note.";
pub const RESTORE_NOTE_FAILED: &str = "Failed to restore the deleted note.";

/// Puts a deleted note back into the cache and the backend's live collection.
pub struct RestoreDeletedNote {
    cache: Arc<dyn NoteCacheDataSource>,
    network: Arc<dyn NoteNetworkDataSource>,
    timeouts: CallTimeouts,
}

impl RestoreDeletedNote {
    pub fn new(
        cache: Arc<dyn NoteCacheDataSource>,
        network: Arc<dyn NoteNetworkDataSource>,
        timeouts: CallTimeouts,
    ) -> Self {
        Self {
            cache,
            network,
            timeouts,
        }
    }

    /// On success the payload carries the restored note as the pending delete,
    /// so the list can put it back where it was.
    pub async fn restore_deleted_note(
        &self,
        note: &Note,
        state_event: Arc<dyn StateEvent>,
        publisher: &Publisher<NoteListViewState>,
    ) {
        debug!(note_id = %note.id, "restoring note");
        let result = safe_cache_call(self.timeouts.cache, self.cache.insert_note(note.clone())).await;
        let restored = matches!(&result, CallResult::Success(Some(row)) if *row > 0);

        let state = ResponseHandler::cache(state_event.clone()).handle(result, |row| {
            if row > 0 {
                DataState::data(
                    Some(Response::success(RESTORE_NOTE_SUCCESS, UiComponentType::Toast)),
                    Some(NoteListViewState {
                        note_pending_delete: Some(NotePendingDelete {
                            note: note.clone(),
                            list_position: None,
                        }),
                        ..NoteListViewState::default()
                    }),
                    Some(state_event.clone()),
                )
            } else {
                DataState::data(
                    Some(Response::error(RESTORE_NOTE_FAILED, UiComponentType::Toast)),
                    None,
                    Some(state_event.clone()),
                )
            }
        });
        publisher.publish(state).await;

        if restored {
            let timeout = self.timeouts.network;
            sync_network(
                timeout,
                "insert_or_update_note",
                self.network.insert_or_update_note(note),
            )
            .await;
            sync_network(
                timeout,
                "delete_deleted_note",
                self.network.delete_deleted_note(note),
            )
            .await;
        }
    }
}
