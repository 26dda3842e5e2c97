//! The coordinator: one fan-in channel, one consumption loop, many jobs.
//!
//! ```text
//! submit(event, job)
//!     │
//!     ├─► EventLedger::try_acquire ── already active ─► Submission::Duplicate
//!     │
//!     ▼ spawn (under the scope's CancellationToken)
//! job(publisher) ──► publisher.publish(DataState) ──┐
//! job(publisher) ──► publisher.publish(DataState) ──┤  bounded mpsc
//!                                                   ▼
//!                                      consumption loop (single reader)
//!                                        ├─► StateHandler::handle_new_data
//!                                        ├─► MessageQueue::append
//!                                        └─► EventLedger release
//! ```
//!
//! # Lifecycle
//!
//! `Uninitialized ─setup()─► Ready ─teardown()─► Uninitialized`
//!
//! `setup` always starts from scratch: the previous scope is cancelled, the
//! ledger is cleared and a new channel and loop are created. Nothing carries
//! over.
//!
//! # Guarantees
//!
//! - **One run per event name**: a second `submit` of an active event is dropped
//! - **FIFO delivery**: the loop handles envelopes in the order they were published
//! - **Release on every path**: success, failure, panic and cancellation all
//!   release the ledger entry
//! - **Release after delivery**: an event published by its own job stays
//!   active until the loop has applied that envelope
//! - **Nothing after teardown**: cancelled jobs cannot publish, and the loop
//!   stops before handling anything still buffered

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::core::{DataState, Response, StateEvent, StateMessage, UiComponentType};
use crate::error::RelayError;
use crate::ledger::{EventLedger, Lease, LeaseGuard};
use crate::messages::MessageQueue;
use crate::response::panic_message;

/// Default fan-in channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Reason shown when a job dies without publishing anything.
pub const JOB_ERROR_UNKNOWN: &str = "Unknown error";

/// Receives payloads from the consumption loop.
///
/// This is the one extension point a concrete screen or session supplies.
/// It is called serially, in delivery order.
pub trait StateHandler<V>: Send + Sync + 'static {
    fn handle_new_data(&self, data: V);
}

impl<V, F> StateHandler<V> for F
where
    F: Fn(V) + Send + Sync + 'static,
{
    fn handle_new_data(&self, data: V) {
        self(data)
    }
}

/// Coordinator configuration.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Envelopes buffered before publishers wait.
    pub channel_capacity: usize,
}

impl ChannelConfig {
    pub fn new() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Set the fan-in capacity. Clamped to at least 1.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// What happened to a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The job was spawned.
    Launched,
    /// The event was already active; the job was dropped.
    Duplicate,
    /// No scope (before `setup` or after `teardown`); the job was dropped.
    NotReady,
}

pub(crate) struct Delivery<V> {
    pub(crate) state: DataState<V>,
    lease: Option<Lease>,
}

/// Handed to each job for publishing its envelopes.
pub struct Publisher<V> {
    sender: mpsc::Sender<Delivery<V>>,
    cancel: CancellationToken,
    lease: Option<Lease>,
    published: Arc<AtomicBool>,
    handed_off: Arc<AtomicBool>,
}

impl<V> Clone for Publisher<V> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            cancel: self.cancel.clone(),
            lease: self.lease.clone(),
            published: self.published.clone(),
            handed_off: self.handed_off.clone(),
        }
    }
}

impl<V: Send + 'static> Publisher<V> {
    pub(crate) fn new(
        sender: mpsc::Sender<Delivery<V>>,
        cancel: CancellationToken,
        lease: Option<Lease>,
    ) -> Self {
        Self {
            sender,
            cancel,
            lease,
            published: Arc::new(AtomicBool::new(false)),
            handed_off: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Publish an envelope onto the fan-in channel.
    ///
    /// Waits while the channel is full. Returns `false` without publishing if
    /// the envelope is empty, the scope was cancelled, or the channel is closed.
    pub async fn publish(&self, state: DataState<V>) -> bool {
        if state.is_empty() {
            trace!("skipping empty envelope");
            return false;
        }
        if self.cancel.is_cancelled() {
            debug!("scope cancelled, dropping envelope");
            return false;
        }

        let lease = match (&self.lease, state.state_event()) {
            (Some(lease), Some(event)) if lease.event_name() == event.event_name() => {
                Some(lease.clone())
            }
            _ => None,
        };
        let carries_lease = lease.is_some();
        let delivery = Delivery { state, lease };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("scope cancelled while waiting for capacity, dropping envelope");
                false
            }
            sent = self.sender.send(delivery) => match sent {
                Ok(()) => {
                    self.published.store(true, Ordering::Release);
                    if carries_lease {
                        self.handed_off.store(true, Ordering::Release);
                    }
                    true
                }
                Err(_) => {
                    debug!("fan-in channel closed, dropping envelope");
                    false
                }
            }
        }
    }

    /// True once the owning scope has been torn down.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves when the owning scope is torn down. Select on this around
    /// long I/O to stop early.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// True if at least one envelope from this job reached the channel.
    pub fn has_published(&self) -> bool {
        self.published.load(Ordering::Acquire)
    }

    /// True once an envelope carrying this job's lease reached the channel.
    /// The consumption loop releases the event after applying it.
    pub(crate) fn has_handed_off_lease(&self) -> bool {
        self.handed_off.load(Ordering::Acquire)
    }
}

impl<V> std::fmt::Debug for Publisher<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("lease", &self.lease)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// State shared between the coordinator and its consumption loop.
struct Shared<V> {
    handler: Arc<dyn StateHandler<V>>,
    ledger: Arc<EventLedger>,
    messages: Mutex<MessageQueue>,
}

impl<V: Send + 'static> Shared<V> {
    fn messages(&self) -> MutexGuard<'_, MessageQueue> {
        // Recover from poisoning: the queue has no invariants a panic can break
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle one delivery. All three steps finish before the next delivery.
    fn apply(&self, delivery: Delivery<V>) {
        let Delivery { state, lease } = delivery;
        let (data, message, event) = state.into_parts();

        if let Some(data) = data {
            if let Err(panic_info) =
                catch_unwind(AssertUnwindSafe(|| self.handler.handle_new_data(data)))
            {
                error!(panic = %panic_message(&panic_info), "state handler panicked");
            }
        }

        if let Some(message) = message {
            trace!(message = ?message.text(), "queueing message");
            self.messages().append(message);
        }

        if let Some(event) = event {
            match lease {
                Some(lease) => self.ledger.release_lease(&lease),
                None => self.ledger.release(event.as_ref()),
            };
        }
    }
}

struct Scope<V> {
    id: u64,
    runtime: Handle,
    sender: mpsc::Sender<Delivery<V>>,
    cancel: CancellationToken,
    consumer: JoinHandle<()>,
}

/// Turns concurrently submitted jobs into one ordered stream of state and messages.
///
/// One instance per screen or session. Share it by reference (or `Arc`) with
/// whatever submits events.
///
/// # Example
///
/// ```ignore
/// let manager = DataChannelManager::new(Arc::new(store), ChannelConfig::default());
/// manager.setup()?;
///
/// let event: Arc<dyn StateEvent> = Arc::new(ListEvent::Search { query });
/// manager.submit(event.clone(), move |publisher| async move {
///     let result = safe_cache_call(timeout, cache.search(&query)).await;
///     let state = ResponseHandler::cache(event.clone()).handle(result, |notes| {
///         DataState::data(None, Some(ListViewState::with_notes(notes)), Some(event))
///     });
///     publisher.publish(state).await;
/// });
/// ```
pub struct DataChannelManager<V> {
    shared: Arc<Shared<V>>,
    config: ChannelConfig,
    scope: Mutex<Option<Scope<V>>>,
    next_scope_id: AtomicU64,
}

impl<V: Send + 'static> DataChannelManager<V> {
    /// Create an uninitialized coordinator. Call [`setup`](Self::setup) before submitting.
    pub fn new(handler: Arc<dyn StateHandler<V>>, config: ChannelConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                handler,
                ledger: Arc::new(EventLedger::new()),
                messages: Mutex::new(MessageQueue::new()),
            }),
            config,
            scope: Mutex::new(None),
            next_scope_id: AtomicU64::new(1),
        }
    }

    fn scope(&self) -> MutexGuard<'_, Option<Scope<V>>> {
        self.scope.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancel any existing scope and start a fresh channel and consumption loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn setup(&self) -> Result<(), RelayError> {
        let runtime = Handle::try_current().map_err(|_| RelayError::NoRuntime)?;

        let mut scope = self.scope();
        if let Some(old) = scope.take() {
            old.cancel.cancel();
            debug!(scope = old.id, "replacing existing scope");
        }
        self.shared.ledger.clear();

        let id = self.next_scope_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.config.channel_capacity);
        let cancel = CancellationToken::new();
        let consumer = runtime.spawn(consume(
            id,
            self.shared.clone(),
            receiver,
            cancel.clone(),
        ));

        *scope = Some(Scope {
            id,
            runtime,
            sender,
            cancel,
            consumer,
        });

        info!(
            scope = id,
            capacity = self.config.channel_capacity,
            "data channel ready"
        );
        Ok(())
    }

    /// Launch `job` for `event` unless that event is already active.
    ///
    /// Returns immediately; results arrive later through the consumption loop.
    pub fn submit<F, Fut>(&self, event: Arc<dyn StateEvent>, job: F) -> Submission
    where
        F: FnOnce(Publisher<V>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = event.event_name();

        let scope = self.scope();
        let Some(scope) = scope.as_ref() else {
            warn!(event = %name, "no active scope, dropping job");
            return Submission::NotReady;
        };

        let Some(lease) = self.shared.ledger.try_acquire(event.as_ref()) else {
            debug!(event = %name, "event already active, ignoring");
            return Submission::Duplicate;
        };

        info!(event = %name, scope = scope.id, "launching job");

        let guard = LeaseGuard::new(self.shared.ledger.clone(), lease.clone());
        let publisher = Publisher::new(scope.sender.clone(), scope.cancel.clone(), Some(lease));
        let fallback = publisher.clone();
        let cancel = scope.cancel.clone();

        scope.runtime.spawn(async move {
            // Releases on cancellation, and when no envelope carried the lease
            let mut guard = guard;
            let name = event.event_name();

            // The job is called inside catch_unwind so a panicking closure is caught too
            let run = AssertUnwindSafe(async move { job(publisher).await }).catch_unwind();

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(event = %name, "job cancelled");
                }
                outcome = run => {
                    match outcome {
                        Ok(()) => trace!(event = %name, "job finished"),
                        Err(panic_info) => {
                            error!(event = %name, panic = %panic_message(&panic_info), "job panicked");
                            if !fallback.has_published() {
                                let message = format!(
                                    "{}\n\nReason: {}",
                                    event.error_info(),
                                    JOB_ERROR_UNKNOWN
                                );
                                fallback
                                    .publish(DataState::error(
                                        Response::error(message, UiComponentType::Toast),
                                        Some(event.clone()),
                                    ))
                                    .await;
                            }
                        }
                    }
                    if fallback.has_handed_off_lease() {
                        guard.disarm();
                    }
                }
            }
        });

        Submission::Launched
    }

    /// Cancel every job in the current scope and clear the ledger. Idempotent.
    pub fn teardown(&self) {
        if let Some(scope) = self.scope().take() {
            scope.cancel.cancel();
            info!(scope = scope.id, "data channel torn down");
        }
        self.shared.ledger.clear();
    }

    /// Tear down and wait for the consumption loop to exit.
    pub async fn shutdown(&self) {
        let scope = self.scope().take();
        self.shared.ledger.clear();
        if let Some(scope) = scope {
            scope.cancel.cancel();
            if let Err(e) = scope.consumer.await {
                warn!(scope = scope.id, error = %e, "consumption loop ended abnormally");
            }
            info!(scope = scope.id, "data channel shut down");
        }
    }

    /// True between `setup` and `teardown`.
    pub fn is_ready(&self) -> bool {
        self.scope().is_some()
    }

    // --- diagnostics -------------------------------------------------------

    pub fn active_event_names(&self) -> Vec<String> {
        self.shared.ledger.list_active()
    }

    pub fn is_event_active(&self, event: &dyn StateEvent) -> bool {
        self.shared.ledger.is_active(event)
    }

    /// True while an active event wants a progress indicator.
    pub fn should_display_progress_bar(&self) -> bool {
        self.shared.ledger.should_display_progress()
    }

    pub fn progress(&self) -> watch::Receiver<bool> {
        self.shared.ledger.subscribe_progress()
    }

    // --- message queue -----------------------------------------------------

    /// Snapshot of queued messages, head first.
    pub fn state_messages(&self) -> Vec<StateMessage> {
        self.shared.messages().iter().cloned().collect()
    }

    pub fn current_state_message(&self) -> Option<StateMessage> {
        self.shared.messages().head().cloned()
    }

    /// Watch the head of the message queue.
    pub fn subscribe_state_message(&self) -> watch::Receiver<Option<StateMessage>> {
        self.shared.messages().subscribe()
    }

    /// Dismiss the message at `index` (0 is the one on screen).
    pub fn clear_state_message(&self, index: usize) -> Option<StateMessage> {
        self.shared.messages().remove_at(index)
    }

    pub fn clear_all_state_messages(&self) {
        self.shared.messages().clear()
    }

    pub fn is_message_queue_empty(&self) -> bool {
        self.shared.messages().is_empty()
    }

    /// Log every queued message at debug level.
    pub fn print_state_messages(&self) {
        for message in self.shared.messages().iter() {
            debug!(message = ?message.text(), kind = ?message.response.message_type, "queued message");
        }
    }
}

impl<V> Drop for DataChannelManager<V> {
    fn drop(&mut self) {
        let scope = self
            .scope
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(scope) = scope {
            scope.cancel.cancel();
        }
    }
}

impl<V> std::fmt::Debug for DataChannelManager<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scope = self
            .scope
            .lock()
            .map(|s| s.as_ref().map(|s| s.id))
            .unwrap_or(None);
        f.debug_struct("DataChannelManager")
            .field("scope", &scope)
            .field("config", &self.config)
            .field("ledger", &self.shared.ledger)
            .finish_non_exhaustive()
    }
}

/// The single reader of the fan-in channel.
async fn consume<V: Send + 'static>(
    scope: u64,
    shared: Arc<Shared<V>>,
    mut receiver: mpsc::Receiver<Delivery<V>>,
    cancel: CancellationToken,
) {
    debug!(scope, "consumption loop starting");

    loop {
        let delivery = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            delivery = receiver.recv() => delivery,
        };

        match delivery {
            Some(delivery) => shared.apply(delivery),
            None => break,
        }
    }

    debug!(scope, "consumption loop stopped");
}
