//! Success/failure mapping for every asynchronous call.
//!
//! A job never hands a raw `Result` to the coordinator. Calls go through two
//! steps:
//!
//! 1. [`safe_cache_call`] / [`safe_api_call`] run the collaborator future under
//!    a timeout, catch panics and classify errors into a [`CallResult`].
//! 2. [`ResponseHandler::handle`] turns that [`CallResult`] into exactly one
//!    [`DataState`], using a caller-supplied mapping for the success case.
//!
//! ```ignore
//! let result = safe_cache_call(timeout, cache.delete_note(&id)).await;
//!
//! let state = ResponseHandler::cache(event.clone()).handle(result, |deleted| {
//!     if deleted > 0 {
//!         DataState::data(Some(Response::success(DELETED, UiComponentType::None)), None, Some(event))
//!     } else {
//!         DataState::error(Response::error(NOT_DELETED, UiComponentType::Toast), Some(event))
//!     }
//! });
//! ```

use std::any::Any;
use std::borrow::Cow;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{error, warn};

use crate::core::{DataState, Response, StateEvent, UiComponentType};
use crate::error::{Categorizable, ErrorCategory};

pub const CACHE_ERROR_UNKNOWN: &str = "Unknown cache error";
pub const CACHE_ERROR_TIMEOUT: &str = "Cache timeout";
pub const CACHE_DATA_NULL: &str = "Cache data is null";

pub const NETWORK_ERROR_UNKNOWN: &str = "Unknown network error";
pub const NETWORK_ERROR_TIMEOUT: &str = "Network timeout";
pub const NETWORK_DATA_NULL: &str = "Network data is null";

/// Which collaborator a call went to. Selects the generic failure texts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSource {
    Cache,
    Network,
}

impl CallSource {
    fn unknown(self) -> &'static str {
        match self {
            CallSource::Cache => CACHE_ERROR_UNKNOWN,
            CallSource::Network => NETWORK_ERROR_UNKNOWN,
        }
    }

    fn timeout(self) -> &'static str {
        match self {
            CallSource::Cache => CACHE_ERROR_TIMEOUT,
            CallSource::Network => NETWORK_ERROR_TIMEOUT,
        }
    }

    fn data_null(self) -> &'static str {
        match self {
            CallSource::Cache => CACHE_DATA_NULL,
            CallSource::Network => NETWORK_DATA_NULL,
        }
    }
}

/// Kind of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    /// Unclassified error or panic.
    Unknown,
    /// A domain error that chose to expose its category.
    Classified(ErrorCategory),
}

/// A sanitised call failure. `reason` is safe to show to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFailure {
    pub kind: FailureKind,
    pub reason: Cow<'static, str>,
}

impl CallFailure {
    pub fn new(kind: FailureKind, reason: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }

    fn unknown(source: CallSource) -> Self {
        Self::new(FailureKind::Unknown, source.unknown())
    }

    fn timeout(source: CallSource) -> Self {
        Self::new(FailureKind::Timeout, source.timeout())
    }

    fn classify<E: Categorizable>(source: CallSource, err: &E) -> Self {
        match err.category() {
            ErrorCategory::Internal => Self::unknown(source),
            category => Self::new(FailureKind::Classified(category), err.safe_message()),
        }
    }
}

/// Raw outcome of a collaborator call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallResult<T> {
    /// The call returned. `None` means it returned nothing.
    Success(Option<T>),
    Failure(CallFailure),
}

/// Run a cache call with a timeout and classify its outcome.
pub async fn safe_cache_call<T, E, F>(timeout: Duration, call: F) -> CallResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Categorizable,
{
    safe_call(CallSource::Cache, timeout, call).await
}

/// Run a network call with a timeout and classify its outcome.
pub async fn safe_api_call<T, E, F>(timeout: Duration, call: F) -> CallResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Categorizable,
{
    safe_call(CallSource::Network, timeout, call).await
}

/// Shared implementation of [`safe_cache_call`] and [`safe_api_call`].
pub async fn safe_call<T, E, F>(source: CallSource, timeout: Duration, call: F) -> CallResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Categorizable,
{
    // AssertUnwindSafe is required because collaborator futures are not UnwindSafe
    let guarded = AssertUnwindSafe(call).catch_unwind();

    match tokio::time::timeout(timeout, guarded).await {
        Err(_) => {
            warn!(?source, timeout_ms = timeout.as_millis() as u64, "call timed out");
            CallResult::Failure(CallFailure::timeout(source))
        }
        Ok(Err(panic_info)) => {
            error!(?source, panic = %panic_message(&panic_info), "call panicked");
            CallResult::Failure(CallFailure::unknown(source))
        }
        Ok(Ok(Err(e))) => {
            // Log raw error for developers (before sanitisation)
            error!(?source, category = %e.category(), error = %e, "call failed");
            CallResult::Failure(CallFailure::classify(source, &e))
        }
        Ok(Ok(Ok(value))) => CallResult::Success(Some(value)),
    }
}

/// Maps a [`CallResult`] into exactly one [`DataState`].
#[derive(Clone)]
pub struct ResponseHandler {
    source: CallSource,
    state_event: Arc<dyn StateEvent>,
    error_display: UiComponentType,
}

impl ResponseHandler {
    pub fn new(source: CallSource, state_event: Arc<dyn StateEvent>) -> Self {
        Self {
            source,
            state_event,
            error_display: UiComponentType::Toast,
        }
    }

    pub fn cache(state_event: Arc<dyn StateEvent>) -> Self {
        Self::new(CallSource::Cache, state_event)
    }

    pub fn network(state_event: Arc<dyn StateEvent>) -> Self {
        Self::new(CallSource::Network, state_event)
    }

    /// Override how failure messages are displayed (default: toast).
    pub fn with_error_display(mut self, ui_component_type: UiComponentType) -> Self {
        self.error_display = ui_component_type;
        self
    }

    /// Map `result`. `on_success` is only called for a non-empty success.
    ///
    /// A panic inside `on_success` becomes an unknown-error envelope.
    pub fn handle<V, T, F>(self, result: CallResult<T>, on_success: F) -> DataState<V>
    where
        F: FnOnce(T) -> DataState<V>,
    {
        match result {
            CallResult::Success(Some(value)) => {
                match catch_unwind(AssertUnwindSafe(|| on_success(value))) {
                    Ok(state) => state,
                    Err(panic_info) => {
                        error!(
                            event = %self.state_event.event_name(),
                            panic = %panic_message(&panic_info),
                            "success mapping panicked"
                        );
                        self.failure(self.source.unknown())
                    }
                }
            }
            CallResult::Success(None) => self.failure(self.source.data_null()),
            CallResult::Failure(failure) => self.failure(&failure.reason),
        }
    }

    fn failure<V>(&self, reason: &str) -> DataState<V> {
        let message = format!("{}\n\nReason: {}", self.state_event.error_info(), reason);
        DataState::error(
            Response::error(message, self.error_display),
            Some(self.state_event.clone()),
        )
    }
}

impl std::fmt::Debug for ResponseHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseHandler")
            .field("source", &self.source)
            .field("event", &self.state_event.event_name())
            .field("error_display", &self.error_display)
            .finish()
    }
}

pub(crate) fn panic_message(panic_info: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
