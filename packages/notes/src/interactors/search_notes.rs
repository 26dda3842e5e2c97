use std::sync::Arc;

use relay::{
    safe_cache_call, DataState, MessageType, Publisher, Response, ResponseHandler, StateEvent,
    UiComponentType,
};
use tracing::debug;

use crate::cache::NoteCacheDataSource;
use crate::config::CallTimeouts;
use crate::state::NoteListViewState;

pub const SEARCH_NOTES_SUCCESS: &str = "Successfully retrieved list of notes.";
pub const SEARCH_NOTES_NO_MATCHING_RESULTS: &str = "There are no notes that match that query.";

pub struct SearchNotes {
    cache: Arc<dyn NoteCacheDataSource>,
    timeouts: CallTimeouts,
}

impl SearchNotes {
    pub fn new(cache: Arc<dyn NoteCacheDataSource>, timeouts: CallTimeouts) -> Self {
        Self { cache, timeouts }
    }

    /// Pages start at 1; anything lower is treated as 1.
    pub async fn search_notes(
        &self,
        query: &str,
        filter_and_order: &str,
        page: i32,
        state_event: Arc<dyn StateEvent>,
        publisher: &Publisher<NoteListViewState>,
    ) {
        let page = page.max(1) as u32;
        debug!(query, filter_and_order, page, "searching notes");

        let result = safe_cache_call(
            self.timeouts.cache,
            self.cache.search_notes(query, filter_and_order, page),
        )
        .await;

        let state = ResponseHandler::cache(state_event.clone()).handle(result, |notes| {
            // An empty result is still a success, but the user is told about it
            let (message, ui_component_type) = if notes.is_empty() {
                (SEARCH_NOTES_NO_MATCHING_RESULTS, UiComponentType::Toast)
            } else {
                (SEARCH_NOTES_SUCCESS, UiComponentType::None)
            };
            DataState::data(
                Some(Response::new(message, ui_component_type, MessageType::Success)),
                Some(NoteListViewState {
                    note_list: Some(notes),
                    search_query: Some(query.to_string()),
                    page: Some(page),
                    filter_and_order: Some(filter_and_order.to_string()),
                    ..NoteListViewState::default()
                }),
                Some(state_event.clone()),
            )
        });
        publisher.publish(state).await;
    }
}
