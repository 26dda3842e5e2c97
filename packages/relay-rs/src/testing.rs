//! Testing utilities for relay jobs and state handlers.
//!
//! # Feature Flag
//!
//! This module is only available with the `testing` feature:
//!
//! ```toml
//! [dev-dependencies]
//! relay = { path = "../relay-rs", features = ["testing"] }
//! ```
//!
//! ## Capturing a job's envelopes
//!
//! ```ignore
//! use relay::testing::capture;
//!
//! let states = capture(|publisher| async move {
//!     delete_note.execute(note, event, publisher).await;
//! })
//! .await;
//!
//! assert_eq!(states.len(), 1);
//! assert_eq!(states[0].message_text(), Some(DELETE_NOTE_SUCCESS));
//! ```
//!
//! ## Waiting for the consumption loop
//!
//! ```ignore
//! let handler = Arc::new(RecordingHandler::new());
//! let manager = DataChannelManager::new(handler.clone(), ChannelConfig::default());
//! manager.setup()?;
//!
//! manager.submit(event, job);
//!
//! handler.wait_for(1, Duration::from_secs(1)).await;  // no sleep
//! assert_eq!(handler.received().len(), 1);
//! ```

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;

use crate::channel::{Publisher, StateHandler};
use crate::core::DataState;

/// A [`StateHandler`] that records every payload it is given.
#[derive(Debug)]
pub struct RecordingHandler<V> {
    received: Mutex<Vec<V>>,
    notify: Notify,
}

impl<V> RecordingHandler<V> {
    pub fn new() -> Self {
        Self {
            received: Mutex::new(Vec::new()),
            notify: Notify::new(),
        }
    }

    /// Number of payloads received so far.
    pub fn len(&self) -> usize {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until at least `count` payloads have arrived.
    ///
    /// # Panics
    ///
    /// Panics if `timeout` elapses first.
    pub async fn wait_for(&self, count: usize, timeout: Duration) {
        let wait = async {
            loop {
                // Register before checking so a concurrent notify is not missed
                let notified = self.notify.notified();
                if self.len() >= count {
                    return;
                }
                notified.await;
            }
        };

        if tokio::time::timeout(timeout, wait).await.is_err() {
            panic!(
                "timed out waiting for {} payloads, received {}",
                count,
                self.len()
            );
        }
    }
}

impl<V: Clone> RecordingHandler<V> {
    /// Snapshot of received payloads, in delivery order.
    pub fn received(&self) -> Vec<V> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recent payload.
    pub fn last(&self) -> Option<V> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl<V> Default for RecordingHandler<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Send + 'static> StateHandler<V> for RecordingHandler<V> {
    fn handle_new_data(&self, data: V) {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(data);
        self.notify.notify_waiters();
    }
}

/// Run `job` with a detached publisher and return everything it published.
///
/// No ledger and no consumption loop are involved: this is for testing what a
/// job emits, in isolation.
pub async fn capture<V, F, Fut>(job: F) -> Vec<DataState<V>>
where
    V: Send + 'static,
    F: FnOnce(Publisher<V>) -> Fut,
    Fut: Future<Output = ()>,
{
    let (sender, mut receiver) = mpsc::channel(16);
    let publisher = Publisher::new(sender, CancellationToken::new(), None);

    let collect = async move {
        let mut states = Vec::new();
        while let Some(delivery) = receiver.recv().await {
            states.push(delivery.state);
        }
        states
    };

    // The job's publisher is dropped when it finishes, which closes the channel
    let ((), states) = tokio::join!(job(publisher), collect);
    states
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Response, UiComponentType};

    #[tokio::test]
    async fn test_capture_collects_in_order() {
        let states = capture(|publisher| async move {
            for n in 0..40u32 {
                publisher.publish(DataState::data(None, Some(n), None)).await;
            }
            publisher
                .publish(DataState::message(Response::success(
                    "done",
                    UiComponentType::None,
                )))
                .await;
        })
        .await;

        assert_eq!(states.len(), 41);
        assert_eq!(states[39].payload(), Some(&39));
        assert_eq!(states[40].message_text(), Some("done"));
    }

    #[tokio::test]
    async fn test_capture_skips_empty_envelopes() {
        let states: Vec<DataState<u32>> = capture(|publisher| async move {
            publisher.publish(DataState::new(None, None, None)).await;
        })
        .await;

        assert!(states.is_empty());
    }

    #[tokio::test]
    async fn test_recording_handler_wait_for() {
        let handler = std::sync::Arc::new(RecordingHandler::new());
        let writer = handler.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            writer.handle_new_data(1u32);
            writer.handle_new_data(2u32);
        });

        handler.wait_for(2, Duration::from_secs(1)).await;
        assert_eq!(handler.received(), vec![1, 2]);
        assert_eq!(handler.last(), Some(2));
    }
}
