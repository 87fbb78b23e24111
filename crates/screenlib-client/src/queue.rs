//! Outbound command queue.
//!
//! Callers enqueue pre-encoded commands from any task; the dispatcher is the
//! only consumer. Ordering is strict FIFO with no deduplication.

use std::collections::VecDeque;

use tokio::sync::Mutex;

use crate::signal::Signal;

/// FIFO of encoded commands plus a has-work signal.
#[derive(Debug, Default)]
pub struct CommandQueue {
    items: Mutex<VecDeque<String>>,
    has_work: Signal,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `command` to the tail and wake the dispatcher.
    ///
    /// Never fails: commands are accepted whether or not a connection is
    /// up, and are dropped if the connection is replaced before they are
    /// sent.
    pub async fn enqueue(&self, command: String) {
        let mut items = self.items.lock().await;
        tracing::trace!(command = %command, pending = items.len() + 1, "Command queued");
        items.push_back(command);
        drop(items);
        self.has_work.set();
    }

    /// Remove and return the head of the queue.
    pub async fn pop(&self) -> Option<String> {
        self.items.lock().await.pop_front()
    }

    /// Drop every queued command and clear the has-work signal.
    pub async fn reset(&self) {
        let mut items = self.items.lock().await;
        if !items.is_empty() {
            tracing::debug!(dropped = items.len(), "Discarding queued commands");
        }
        items.clear();
        self.has_work.clear();
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    /// Set whenever a command is enqueued.
    pub fn has_work(&self) -> &Signal {
        &self.has_work
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fifo_order() {
        let queue = CommandQueue::new();
        queue.enqueue("A".into()).await;
        queue.enqueue("B".into()).await;
        queue.enqueue("A".into()).await;

        assert_eq!(queue.len().await, 3);
        assert_eq!(queue.pop().await.as_deref(), Some("A"));
        assert_eq!(queue.pop().await.as_deref(), Some("B"));
        assert_eq!(queue.pop().await.as_deref(), Some("A"));
        assert_eq!(queue.pop().await, None);
    }

    #[tokio::test]
    async fn enqueue_sets_has_work() {
        let queue = CommandQueue::new();
        assert!(!queue.has_work().is_set());
        queue.enqueue("#1.1.0.MOTOR=UP;".into()).await;
        assert!(queue.has_work().is_set());
    }

    #[tokio::test]
    async fn reset_clears_items_and_signal() {
        let queue = CommandQueue::new();
        queue.enqueue("#1.1.0.MOTOR=UP;".into()).await;
        queue.enqueue("#1.1.0.MOTOR=DOWN;".into()).await;

        queue.reset().await;

        assert!(queue.is_empty().await);
        assert!(!queue.has_work().is_set());
    }
}
