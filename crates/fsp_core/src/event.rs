//! Typed observer primitive: subscribe returns a disposable subscription

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Listeners<T> {
    next_id: u64,
    entries: Vec<(u64, Listener<T>)>,
}

/// A multi-listener event source
///
/// Listeners are invoked in subscription order, outside the internal lock,
/// so a listener may subscribe or unsubscribe reentrantly.
pub struct Emitter<T> {
    listeners: Arc<Mutex<Listeners<T>>>,
}

impl<T: 'static> Emitter<T> {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(Listeners {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Register a listener; dropping the returned subscription removes it
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = {
            let mut inner = self.listeners.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.entries.push((id, Arc::new(listener)));
            id
        };

        let weak: Weak<Mutex<Listeners<T>>> = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = weak.upgrade() {
                listeners.lock().entries.retain(|(entry_id, _)| *entry_id != id);
            }
        })
    }

    /// Fire the event to all current listeners
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<Listener<T>> = {
            let inner = self.listeners.lock();
            inner.entries.iter().map(|(_, l)| Arc::clone(l)).collect()
        };

        for listener in snapshot {
            listener(value);
        }
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().entries.len()
    }
}

impl<T: 'static> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to an active listener registration
///
/// Dropping the subscription unsubscribes. `dispose` does the same
/// explicitly.
pub struct Subscription {
    cleanup: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    fn new(cleanup: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cleanup: Some(Box::new(cleanup)),
        }
    }

    /// Unsubscribe now instead of at drop time
    pub fn dispose(mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_reaches_listeners() {
        let emitter: Emitter<u32> = Emitter::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let seen_a = Arc::clone(&seen);
        let _sub_a = emitter.subscribe(move |v| {
            seen_a.fetch_add(*v as usize, Ordering::SeqCst);
        });
        let seen_b = Arc::clone(&seen);
        let _sub_b = emitter.subscribe(move |v| {
            seen_b.fetch_add(*v as usize, Ordering::SeqCst);
        });

        emitter.emit(&3);
        assert_eq!(seen.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let emitter: Emitter<()> = Emitter::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_inner = Arc::clone(&calls);
        let sub = emitter.subscribe(move |_| {
            calls_inner.fetch_add(1, Ordering::SeqCst);
        });
        emitter.emit(&());
        drop(sub);
        emitter.emit(&());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(emitter.listener_count(), 0);
    }

    #[test]
    fn test_explicit_dispose() {
        let emitter: Emitter<()> = Emitter::new();
        let sub = emitter.subscribe(|_| {});
        assert_eq!(emitter.listener_count(), 1);
        sub.dispose();
        assert_eq!(emitter.listener_count(), 0);
    }
}
