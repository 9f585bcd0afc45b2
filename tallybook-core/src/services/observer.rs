//! Listener lists for state snapshots

use std::sync::{Arc, Mutex, PoisonError};

/// Callback receiving a state snapshot
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Registered listeners, notified in subscription order
pub struct Listeners<T> {
    inner: Mutex<Vec<Listener<T>>>,
}

impl<T> Listeners<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    /// Call every listener with `snapshot`
    ///
    /// The list is copied first, so a listener may subscribe or read the
    /// notifying component without deadlocking.
    pub fn notify(&self, snapshot: &T) {
        let listeners: Vec<Listener<T>> = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener(snapshot);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_notify_in_order() {
        let listeners: Listeners<u32> = Listeners::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b"] {
            let seen = Arc::clone(&seen);
            listeners.subscribe(move |v: &u32| seen.lock().unwrap().push(format!("{}{}", tag, v)));
        }
        listeners.notify(&1);

        assert_eq!(listeners.len(), 2);
        assert_eq!(*seen.lock().unwrap(), vec!["a1", "b1"]);
    }

    #[test]
    fn test_subscribe_from_listener() {
        let listeners: Arc<Listeners<u32>> = Arc::new(Listeners::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let inner = Arc::clone(&listeners);
        let counter = Arc::clone(&calls);
        listeners.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            inner.subscribe(|_| {});
        });
        listeners.notify(&0);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(listeners.len(), 2);
    }
}
