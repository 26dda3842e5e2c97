//! Use cases. Each one runs a cache call, publishes exactly one envelope and,
//! when the cache write succeeded, mirrors it to the sync backend.
//!
//! Network follow-ups run after the envelope is published. Their failures are
//! logged and never reach the user; the next sync catches up.

mod delete_note;
mod get_num_notes;
mod insert_new_note;
mod restore_deleted_note;
mod search_notes;
mod update_note;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use relay::{safe_api_call, CallResult};
use tracing::{debug, warn};

use crate::cache::NoteCacheDataSource;
use crate::config::CallTimeouts;
use crate::model::NoteFactory;
use crate::network::{NetworkError, NoteNetworkDataSource};
use crate::state::NoteListViewState;

pub use delete_note::{DeleteNote, DELETE_NOTE_FAILURE, DELETE_NOTE_SUCCESS};
pub use get_num_notes::{GetNumNotes, GET_NUM_NOTES_SUCCESS};
pub use insert_new_note::{InsertNewNote, INSERT_NOTE_FAILED, INSERT_NOTE_SUCCESS};
pub use restore_deleted_note::{RestoreDeletedNote, RESTORE_NOTE_FAILED, RESTORE_NOTE_SUCCESS};
pub use search_notes::{SearchNotes, SEARCH_NOTES_NO_MATCHING_RESULTS, SEARCH_NOTES_SUCCESS};
pub use update_note::{UpdateNote, UPDATE_NOTE_FAILED, UPDATE_NOTE_SUCCESS};

/// Use cases of the note list screen.
#[derive(Clone)]
pub struct NoteListInteractors {
    pub insert_new_note: Arc<InsertNewNote>,
    pub update_note: Arc<UpdateNote<NoteListViewState>>,
    pub delete_note: Arc<DeleteNote<NoteListViewState>>,
    pub restore_deleted_note: Arc<RestoreDeletedNote>,
    pub search_notes: Arc<SearchNotes>,
    pub get_num_notes: Arc<GetNumNotes>,
}

impl NoteListInteractors {
    pub fn new(
        cache: Arc<dyn NoteCacheDataSource>,
        network: Arc<dyn NoteNetworkDataSource>,
        factory: NoteFactory,
        timeouts: CallTimeouts,
    ) -> Self {
        Self {
            insert_new_note: Arc::new(InsertNewNote::new(
                cache.clone(),
                network.clone(),
                factory,
                timeouts,
            )),
            update_note: Arc::new(UpdateNote::new(cache.clone(), network.clone(), timeouts)),
            delete_note: Arc::new(DeleteNote::new(cache.clone(), network.clone(), timeouts)),
            restore_deleted_note: Arc::new(RestoreDeletedNote::new(
                cache.clone(),
                network,
                timeouts,
            )),
            search_notes: Arc::new(SearchNotes::new(cache.clone(), timeouts)),
            get_num_notes: Arc::new(GetNumNotes::new(cache, timeouts)),
        }
    }
}

impl std::fmt::Debug for NoteListInteractors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteListInteractors").finish_non_exhaustive()
    }
}

/// Best-effort backend write.
async fn sync_network<T, F>(timeout: Duration, operation: &'static str, call: F)
where
    F: Future<Output = Result<T, NetworkError>>,
{
    match safe_api_call(timeout, call).await {
        CallResult::Success(_) => debug!(operation, "network sync done"),
        CallResult::Failure(failure) => {
            warn!(operation, kind = ?failure.kind, reason = %failure.reason, "network sync failed")
        }
    }
}
