//! Observer registry for decoded controller messages.

use std::sync::Arc;

use screenlib_core::ParsedMessage;
use tokio::sync::RwLock;

/// Receives every message the listener decodes.
///
/// Called on the listener task; implementations should return quickly and
/// hand heavy work off to their own tasks. Any
/// `Fn(&ParsedMessage) + Send + Sync` closure is an observer.
pub trait MessageObserver: Send + Sync {
    fn on_message(&self, message: &ParsedMessage);
}

impl<F> MessageObserver for F
where
    F: Fn(&ParsedMessage) + Send + Sync,
{
    fn on_message(&self, message: &ParsedMessage) {
        self(message)
    }
}

/// Ordered set of observers, keyed on `Arc` identity.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: RwLock<Vec<Arc<dyn MessageObserver>>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `observer` unless it is already registered. Returns whether it
    /// was added.
    pub async fn register(&self, observer: Arc<dyn MessageObserver>) -> bool {
        let mut observers = self.observers.write().await;
        if observers.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            return false;
        }
        observers.push(observer);
        tracing::debug!(observers = observers.len(), "Observer registered");
        true
    }

    /// Remove `observer` if present. Returns whether it was removed.
    pub async fn deregister(&self, observer: &Arc<dyn MessageObserver>) -> bool {
        let mut observers = self.observers.write().await;
        let before = observers.len();
        observers.retain(|o| !Arc::ptr_eq(o, observer));
        let removed = observers.len() != before;
        if removed {
            tracing::debug!(observers = observers.len(), "Observer deregistered");
        }
        removed
    }

    /// Deliver `message` to every observer in registration order.
    ///
    /// Works on a snapshot, so observers may register or deregister from
    /// inside the callback without deadlocking.
    pub async fn notify(&self, message: &ParsedMessage) {
        let snapshot = self.observers.read().await.clone();
        for observer in snapshot {
            observer.on_message(message);
        }
    }

    pub async fn len(&self) -> usize {
        self.observers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.observers.read().await.is_empty()
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry").finish_non_exhaustive()
    }
}
