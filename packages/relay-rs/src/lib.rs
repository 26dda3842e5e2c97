//! # Relay
//!
//! Reactive state coordination for a screen or session: many concurrent jobs,
//! one ordered stream of view state and user messages.
//!
//! ## Core Concepts
//!
//! - [`StateEvent`] = a named trigger for one asynchronous operation
//! - [`DataState`] = the envelope every operation ends in (payload, message, event)
//! - [`DataChannelManager`] = the coordinator that runs jobs and serialises their results
//!
//! The key principle: **One Event Name = At Most One Running Job**.
//! A second submission of an event that is still running is dropped.
//!
//! ## Architecture
//!
//! ```text
//! UI / caller
//!     │
//!     ▼ submit(event, job)
//! EventLedger ── already active ─► dropped
//!     │
//!     ▼ spawn
//! job ─► safe_cache_call / safe_api_call ─► CallResult
//!     │                                       │
//!     │              ResponseHandler::handle ◄┘
//!     ▼
//! Publisher::publish(DataState) ──► bounded mpsc ──► consumption loop
//!                                                      ├─► StateHandler
//!                                                      ├─► MessageQueue
//!                                                      └─► EventLedger release
//! ```
//!
//! ## Key Invariants
//!
//! 1. **Single consumer** - only the consumption loop touches view state and the queue
//! 2. **Release on every path** - the ledger entry goes away on success, failure,
//!    panic and cancellation
//! 3. **Sanitised failures** - no raw error reaches the loop; see [`Categorizable`]
//! 4. **Nothing after teardown** - cancelled jobs cannot publish
//!
//! ## Example
//!
//! ```ignore
//! use relay::{ChannelConfig, DataChannelManager, DataState, ResponseHandler, safe_cache_call};
//!
//! let manager = DataChannelManager::new(Arc::new(store), ChannelConfig::default());
//! manager.setup()?;
//!
//! let event: Arc<dyn StateEvent> = Arc::new(ListEvent::Count);
//! manager.submit(event.clone(), move |publisher| async move {
//!     let result = safe_cache_call(timeout, cache.count()).await;
//!     let state = ResponseHandler::cache(event.clone()).handle(result, |n| {
//!         DataState::data(None, Some(ListViewState::with_count(n)), Some(event))
//!     });
//!     publisher.publish(state).await;
//! });
//!
//! // later
//! manager.teardown();
//! ```

mod channel;
mod core;
mod error;
mod ledger;
mod messages;
mod response;

// Testing utilities (feature-gated)
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use crate::core::{DataState, MessageType, Response, StateEvent, StateMessage, UiComponentType};

pub use crate::error::{Categorizable, ErrorCategory, RelayError};

pub use crate::response::{
    safe_api_call, safe_cache_call, safe_call, CallFailure, CallResult, CallSource, FailureKind,
    ResponseHandler, CACHE_DATA_NULL, CACHE_ERROR_TIMEOUT, CACHE_ERROR_UNKNOWN, NETWORK_DATA_NULL,
    NETWORK_ERROR_TIMEOUT, NETWORK_ERROR_UNKNOWN,
};

pub use crate::ledger::{EventLedger, Lease};

pub use crate::messages::MessageQueue;

pub use crate::channel::{
    ChannelConfig, DataChannelManager, Publisher, StateHandler, Submission,
    DEFAULT_CHANNEL_CAPACITY, JOB_ERROR_UNKNOWN,
};
