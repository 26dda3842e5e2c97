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
use crate::date_util::DateUtil;
use crate::model::Note;
use crate::network::NoteNetworkDataSource;

pub const UPDATE_NOTE_SUCCESS: &str = "Successfully updated note.";
pub const UPDATE_NOTE_FAILED: &str = "Failed to update note.";

/// Writes a note's title and body to the cache, then to the backend.
pub struct UpdateNote<V> {
    cache: Arc<dyn NoteCacheDataSource>,
    network: Arc<dyn NoteNetworkDataSource>,
    timeouts: CallTimeouts,
    date_util: DateUtil,
    _view_state: PhantomData<fn() -> V>,
}

impl<V: Send + 'static> UpdateNote<V> {
    pub fn new(
        cache: Arc<dyn NoteCacheDataSource>,
        network: Arc<dyn NoteNetworkDataSource>,
        timeouts: CallTimeouts,
    ) -> Self {
        Self {
            cache,
            network,
            timeouts,
            date_util: DateUtil::new(),
            _view_state: PhantomData,
        }
    }

    /// `note` carries the new title and body.
    pub async fn update_note(
        &self,
        note: &Note,
        state_event: Arc<dyn StateEvent>,
        publisher: &Publisher<V>,
    ) {
        debug!(note_id = %note.id, "updating note");
        let result = safe_cache_call(
            self.timeouts.cache,
            self.cache.update_note(&note.id, &note.title, &note.body),
        )
        .await;
        let updated = matches!(&result, CallResult::Success(Some(rows)) if *rows > 0);

        let state = ResponseHandler::cache(state_event.clone()).handle(result, |rows| {
            if rows > 0 {
                DataState::data(
                    Some(Response::success(UPDATE_NOTE_SUCCESS, UiComponentType::Toast)),
                    None,
                    Some(state_event.clone()),
                )
            } else {
                DataState::data(
                    Some(Response::error(UPDATE_NOTE_FAILED, UiComponentType::Toast)),
                    None,
                    Some(state_event.clone()),
                )
            }
        });
        publisher.publish(state).await;

        if updated {
            let synced = Note {
                updated_at: self.date_util.current_timestamp(),
                ..note.clone()
            };
            sync_network(
                self.timeouts.network,
                "insert_or_update_note",
                self.network.insert_or_update_note(&synced),
            )
            .await;
        }
    }
}
