use std::sync::Arc;

use relay::{
    safe_cache_call, DataState, Publisher, Response, ResponseHandler, StateEvent, UiComponentType,
};

use crate::cache::NoteCacheDataSource;
use crate::config::CallTimeouts;
use crate::state::NoteListViewState;

pub const GET_NUM_NOTES_SUCCESS: &str =
    "Successfully retrieved the number of notes from the cache.";

pub struct GetNumNotes {
    cache: Arc<dyn NoteCacheDataSource>,
    timeouts: CallTimeouts,
}

impl GetNumNotes {
    pub fn new(cache: Arc<dyn NoteCacheDataSource>, timeouts: CallTimeouts) -> Self {
        Self { cache, timeouts }
    }

    pub async fn get_num_notes(
        &self,
        state_event: Arc<dyn StateEvent>,
        publisher: &Publisher<NoteListViewState>,
    ) {
        let result = safe_cache_call(self.timeouts.cache, self.cache.get_num_notes()).await;

        let state = ResponseHandler::cache(state_event.clone()).handle(result, |count| {
            DataState::data(
                Some(Response::success(GET_NUM_NOTES_SUCCESS, UiComponentType::None)),
                Some(NoteListViewState::with_num_notes(count)),
                Some(state_event.clone()),
            )
        });
        publisher.publish(state).await;
    }
}
