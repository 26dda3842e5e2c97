//! Ordered queue of messages waiting to be shown.
//!
//! Insertion order is display order. The queue is not synchronised; the
//! coordinator owns it behind a lock and only touches it from the consumption
//! loop and the explicit dismiss calls.

use tokio::sync::watch;

use crate::core::StateMessage;

/// FIFO of [`StateMessage`]s.
///
/// After every mutation the current head is published on a watch channel so a
/// presentation layer can render one message at a time.
pub struct MessageQueue {
    messages: Vec<StateMessage>,
    head: watch::Sender<Option<StateMessage>>,
}

impl MessageQueue {
    pub fn new() -> Self {
        let (head, _) = watch::channel(None);
        Self {
            messages: Vec::new(),
            head,
        }
    }

    /// Append at the tail. Duplicates are queued independently.
    pub fn append(&mut self, message: StateMessage) {
        self.messages.push(message);
        if self.messages.len() == 1 {
            self.publish_head();
        }
    }

    /// Remove the head.
    pub fn pop_front(&mut self) -> Option<StateMessage> {
        self.remove_at(0)
    }

    /// Remove the message at `index`. Out of range returns `None`.
    ///
    /// Later entries keep their relative order.
    pub fn remove_at(&mut self, index: usize) -> Option<StateMessage> {
        if index >= self.messages.len() {
            return None;
        }
        let removed = self.messages.remove(index);
        if index == 0 {
            self.publish_head();
        }
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.publish_head();
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn head(&self) -> Option<&StateMessage> {
        self.messages.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StateMessage> {
        self.messages.iter()
    }

    /// Watch the head message.
    pub fn subscribe(&self) -> watch::Receiver<Option<StateMessage>> {
        self.head.subscribe()
    }

    fn publish_head(&self) {
        self.head.send_replace(self.messages.first().cloned());
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MessageQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.messages.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a MessageQueue {
    type Item = &'a StateMessage;
    type IntoIter = std::slice::Iter<'a, StateMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Response, UiComponentType};

    fn msg(text: &str) -> StateMessage {
        StateMessage::new(Response::success(text, UiComponentType::Toast))
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = MessageQueue::new();
        queue.append(msg("M1"));
        queue.append(msg("M2"));

        assert_eq!(queue.pop_front(), Some(msg("M1")));
        assert_eq!(queue.head(), Some(&msg("M2")));
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut queue = MessageQueue::new();
        queue.append(msg("same"));
        queue.append(msg("same"));

        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_remove_at_preserves_later_order() {
        let mut queue = MessageQueue::new();
        for text in ["a", "b", "c", "d"] {
            queue.append(msg(text));
        }

        assert_eq!(queue.remove_at(1), Some(msg("b")));

        let texts: Vec<_> = queue.iter().filter_map(StateMessage::text).collect();
        assert_eq!(texts, vec!["a", "c", "d"]);
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut queue = MessageQueue::new();
        assert_eq!(queue.pop_front(), None);

        queue.append(msg("a"));
        assert_eq!(queue.remove_at(3), None);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut queue = MessageQueue::new();
        queue.append(msg("a"));
        queue.append(msg("b"));
        queue.clear();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_head_watch_follows_queue() {
        let mut queue = MessageQueue::new();
        let rx = queue.subscribe();
        assert_eq!(*rx.borrow(), None);

        queue.append(msg("first"));
        queue.append(msg("second"));
        assert_eq!(*rx.borrow(), Some(msg("first")));

        queue.pop_front();
        assert_eq!(*rx.borrow(), Some(msg("second")));

        queue.clear();
        assert_eq!(*rx.borrow(), None);
    }
}
