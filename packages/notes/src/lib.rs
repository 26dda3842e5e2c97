//! # Notes
//!
//! Note-taking client core built on [`relay`].
//!
//! - [`cache`] - the local store ([`NoteCacheDataSource`], [`InMemoryNoteCache`])
//! - [`network`] - the cloud sync backend ([`NoteNetworkDataSource`], [`InMemoryNoteNetwork`])
//! - [`interactors`] - one use case per user action
//! - [`session`] - the note list screen: events in, view state and messages out
//!
//! ```ignore
//! let config = Config::from_env()?;
//! let cache: Arc<dyn NoteCacheDataSource> = Arc::new(InMemoryNoteCache::new(config.page_size));
//! let network: Arc<dyn NoteNetworkDataSource> = Arc::new(InMemoryNoteNetwork::new());
//!
//! let interactors = NoteListInteractors::new(cache, network, NoteFactory::default(), config.timeouts());
//! let session = NoteListSession::new(interactors, config.channel_config());
//! session.setup()?;
//!
//! session.set_state_event(NoteListStateEvent::GetNumNotesInCache);
//! ```

pub mod cache;
pub mod config;
pub mod date_util;
pub mod interactors;
pub mod model;
pub mod network;
pub mod session;
pub mod state;

pub use cache::{CacheError, InMemoryNoteCache, NoteCacheDataSource, NoteOrdering};
pub use config::{CallTimeouts, Config};
pub use date_util::DateUtil;
pub use interactors::NoteListInteractors;
pub use model::{Note, NoteFactory};
pub use network::{InMemoryNoteNetwork, NetworkError, NoteNetworkDataSource};
pub use session::NoteListSession;
pub use state::{NoteListStateEvent, NoteListStore, NoteListViewState, NotePendingDelete};
