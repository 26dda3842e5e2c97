#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use notes::{
    CallTimeouts, InMemoryNoteCache, InMemoryNoteNetwork, NoteCacheDataSource, NoteFactory,
    NoteListInteractors, NoteListStateEvent,
};
use relay::StateEvent;

pub const PAGE_SIZE: usize = 10;

/// Collaborators seeded with `seeded` notes in both cache and backend.
pub struct TestDependencies {
    pub cache: Arc<InMemoryNoteCache>,
    pub network: Arc<InMemoryNoteNetwork>,
    pub factory: NoteFactory,
    pub timeouts: CallTimeouts,
}

impl TestDependencies {
    pub async fn seeded(count: usize) -> Self {
        Self::build(InMemoryNoteCache::new(PAGE_SIZE), count).await
    }

    pub async fn build(cache: InMemoryNoteCache, count: usize) -> Self {
        use notes::NoteNetworkDataSource;

        let factory = NoteFactory::default();
        let cache = Arc::new(cache);
        let network = Arc::new(InMemoryNoteNetwork::new());

        let notes = factory.create_note_list(count);
        cache.insert_notes(notes.clone()).await.unwrap();
        network.insert_or_update_notes(&notes).await.unwrap();

        Self {
            cache,
            network,
            factory,
            timeouts: CallTimeouts {
                cache: Duration::from_millis(500),
                network: Duration::from_millis(500),
            },
        }
    }

    pub fn interactors(&self) -> NoteListInteractors {
        NoteListInteractors::new(
            self.cache.clone(),
            self.network.clone(),
            self.factory.clone(),
            self.timeouts,
        )
    }
}

pub fn event(event: NoteListStateEvent) -> Arc<dyn StateEvent> {
    Arc::new(event)
}
