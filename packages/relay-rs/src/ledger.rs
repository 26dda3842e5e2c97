//! Event dedup ledger.
//!
//! Tracks which events currently have work in flight. An event is keyed by
//! [`StateEvent::event_name`], so dedup operates at event-type granularity.
//!
//! Every acquisition is stamped with a generation. [`Lease`] remembers it, and
//! [`EventLedger::release_lease`] only frees the entry it was issued for.
//! A job that outlives its own release can therefore never free a newer
//! acquisition of the same event.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::watch;
use tracing::trace;

use crate::core::StateEvent;

#[derive(Debug, Clone, Copy)]
struct ActiveEvent {
    generation: u64,
    shows_progress: bool,
}

/// Proof of one successful [`EventLedger::try_acquire`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    name: String,
    generation: u64,
}

impl Lease {
    pub fn event_name(&self) -> &str {
        &self.name
    }
}

/// Set of active event names.
pub struct EventLedger {
    entries: DashMap<String, ActiveEvent>,
    next_generation: AtomicU64,
    progress: watch::Sender<bool>,
}

impl EventLedger {
    pub fn new() -> Self {
        let (progress, _) = watch::channel(false);
        Self {
            entries: DashMap::new(),
            next_generation: AtomicU64::new(1),
            progress,
        }
    }

    /// Mark `event` active. Returns `None` if it already is.
    ///
    /// Atomic: of two concurrent calls for the same name, exactly one wins.
    pub fn try_acquire(&self, event: &dyn StateEvent) -> Option<Lease> {
        let name = event.event_name().into_owned();
        let lease = match self.entries.entry(name.clone()) {
            Entry::Occupied(_) => return None,
            Entry::Vacant(vacant) => {
                let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                vacant.insert(ActiveEvent {
                    generation,
                    shows_progress: event.should_display_progress_bar(),
                });
                Lease { name, generation }
            }
        };
        // Shard lock released above; safe to iterate now
        self.refresh_progress();
        trace!(event = %lease.name, generation = lease.generation, "event acquired");
        Some(lease)
    }

    /// Release `event` by name. Idempotent.
    pub fn release(&self, event: &dyn StateEvent) -> bool {
        self.release_name(&event.event_name())
    }

    /// Release by name. Idempotent.
    pub fn release_name(&self, name: &str) -> bool {
        let removed = self.entries.remove(name).is_some();
        if removed {
            self.refresh_progress();
            trace!(event = %name, "event released");
        }
        removed
    }

    /// Release the acquisition `lease` was issued for, if it is still current.
    pub fn release_lease(&self, lease: &Lease) -> bool {
        let removed = self
            .entries
            .remove_if(&lease.name, |_, active| active.generation == lease.generation)
            .is_some();
        if removed {
            self.refresh_progress();
            trace!(event = %lease.name, generation = lease.generation, "lease released");
        }
        removed
    }

    pub fn is_active(&self, event: &dyn StateEvent) -> bool {
        self.is_name_active(&event.event_name())
    }

    pub fn is_name_active(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Drop every entry. Outstanding leases become stale.
    pub fn clear(&self) {
        self.entries.clear();
        self.refresh_progress();
    }

    /// Names of active events, sorted. Diagnostic only.
    pub fn list_active(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True while any active event wants a progress indicator.
    pub fn should_display_progress(&self) -> bool {
        *self.progress.borrow()
    }

    /// Watch the progress flag.
    pub fn subscribe_progress(&self) -> watch::Receiver<bool> {
        self.progress.subscribe()
    }

    fn refresh_progress(&self) {
        // Scan under the watch lock so concurrent refreshes cannot send out of order
        self.progress.send_if_modified(|current| {
            let showing = self.entries.iter().any(|e| e.value().shows_progress);
            if *current != showing {
                *current = showing;
                true
            } else {
                false
            }
        });
    }
}

impl Default for EventLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLedger")
            .field("active", &self.list_active())
            .finish()
    }
}

/// RAII guard that releases a lease on drop.
///
/// Held by the task running a job. Once the job has handed its lease to the
/// consumption loop the guard is disarmed, and the loop releases the entry
/// after applying the envelope.
pub(crate) struct LeaseGuard {
    ledger: Arc<EventLedger>,
    lease: Option<Lease>,
}

impl LeaseGuard {
    pub(crate) fn new(ledger: Arc<EventLedger>, lease: Lease) -> Self {
        Self {
            ledger,
            lease: Some(lease),
        }
    }

    /// Leave the release to whoever now holds the lease.
    pub(crate) fn disarm(&mut self) {
        self.lease = None;
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if let Some(lease) = self.lease.take() {
            self.ledger.release_lease(&lease);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    struct Named(&'static str, bool);

    impl StateEvent for Named {
        fn event_name(&self) -> Cow<'static, str> {
            self.0.into()
        }

        fn error_info(&self) -> String {
            String::new()
        }

        fn should_display_progress_bar(&self) -> bool {
            self.1
        }
    }

    #[test]
    fn test_acquire_rejects_duplicate() {
        let ledger = EventLedger::new();

        assert!(ledger.try_acquire(&Named("Delete", true)).is_some());
        assert!(ledger.try_acquire(&Named("Delete", true)).is_none());
        assert!(ledger.try_acquire(&Named("Search", true)).is_some());

        assert_eq!(ledger.list_active(), vec!["Delete", "Search"]);
    }

    #[test]
    fn test_release_is_idempotent() {
        let ledger = EventLedger::new();
        let event = Named("Delete", true);

        ledger.try_acquire(&event).unwrap();
        assert!(ledger.release(&event));
        assert!(!ledger.release(&event));
        assert!(!ledger.is_active(&event));

        // Never acquired
        assert!(!ledger.release(&Named("Other", true)));
    }

    #[test]
    fn test_stale_lease_does_not_free_newer_acquisition() {
        let ledger = EventLedger::new();
        let event = Named("Delete", true);

        let old = ledger.try_acquire(&event).unwrap();
        ledger.release(&event);
        let new = ledger.try_acquire(&event).unwrap();

        assert!(!ledger.release_lease(&old));
        assert!(ledger.is_active(&event));

        assert!(ledger.release_lease(&new));
        assert!(!ledger.is_active(&event));
    }

    #[test]
    fn test_clear() {
        let ledger = EventLedger::new();
        let lease = ledger.try_acquire(&Named("A", true)).unwrap();
        ledger.try_acquire(&Named("B", true)).unwrap();

        ledger.clear();

        assert!(ledger.is_empty());
        assert!(!ledger.release_lease(&lease));
    }

    #[test]
    fn test_progress_tracks_events_that_want_it() {
        let ledger = EventLedger::new();
        let quiet = Named("Count", false);
        let loud = Named("Search", true);

        ledger.try_acquire(&quiet).unwrap();
        assert!(!ledger.should_display_progress());

        ledger.try_acquire(&loud).unwrap();
        assert!(ledger.should_display_progress());

        ledger.release(&loud);
        assert!(!ledger.should_display_progress());
    }

    #[tokio::test]
    async fn test_progress_watch_notifies() {
        let ledger = EventLedger::new();
        let mut rx = ledger.subscribe_progress();

        ledger.try_acquire(&Named("Search", true)).unwrap();
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let ledger = Arc::new(EventLedger::new());
        let lease = ledger.try_acquire(&Named("Delete", true)).unwrap();

        {
            let _guard = LeaseGuard::new(ledger.clone(), lease);
            assert!(ledger.is_name_active("Delete"));
        }

        assert!(ledger.is_empty());
    }

    #[test]
    fn test_disarmed_guard_keeps_entry() {
        let ledger = Arc::new(EventLedger::new());
        let lease = ledger.try_acquire(&Named("Delete", true)).unwrap();

        {
            let mut guard = LeaseGuard::new(ledger.clone(), lease.clone());
            guard.disarm();
        }

        assert!(ledger.is_name_active("Delete"));
        assert!(ledger.release_lease(&lease));
    }

    #[test]
    fn test_progress_clears_after_concurrent_churn() {
        let ledger = Arc::new(EventLedger::new());
        let names = ["Insert", "Update", "Delete", "Search"];

        for _ in 0..50 {
            let handles: Vec<_> = names
                .iter()
                .map(|name| {
                    let ledger = ledger.clone();
                    let name = *name;
                    std::thread::spawn(move || {
                        let event = Named(name, true);
                        for _ in 0..200 {
                            if let Some(lease) = ledger.try_acquire(&event) {
                                ledger.release_lease(&lease);
                            }
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            assert!(ledger.is_empty());
            assert!(!ledger.should_display_progress());
        }
    }

    #[test]
    fn test_concurrent_acquire_has_single_winner() {
        let ledger = Arc::new(EventLedger::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ledger = ledger.clone();
                std::thread::spawn(move || ledger.try_acquire(&Named("Delete", true)).is_some())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
    }
}
