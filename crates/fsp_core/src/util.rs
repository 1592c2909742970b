//! Disposal and scheduling primitives

use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// A teardown callback that runs exactly once, at drop or on `dispose`
pub struct Disposable {
    cleanup: Option<Box<dyn FnOnce() + Send>>,
}

impl Disposable {
    pub fn new(cleanup: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cleanup: Some(Box::new(cleanup)),
        }
    }

    /// A disposable that does nothing
    pub fn empty() -> Self {
        Self { cleanup: None }
    }

    /// Combine several teardown steps into one disposable
    pub fn from_parts(parts: Vec<Disposable>) -> Self {
        Self::new(move || {
            for part in parts {
                part.dispose();
            }
        })
    }

    pub fn dispose(mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

impl Drop for Disposable {
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

type Task = Box<dyn FnOnce() + Send>;

/// Scheduled-at-most-once task runner
///
/// `trigger` while a run is pending replaces the pending task; the first
/// scheduled call fires after `delay`. A burst of triggers therefore
/// collapses into a single execution of the last task.
pub struct ThrottledDelayer {
    delay: Duration,
    pending: Arc<Mutex<Option<Task>>>,
}

impl ThrottledDelayer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    pub fn trigger(&self, task: impl FnOnce() + Send + 'static) {
        let mut pending = self.pending.lock();
        if pending.is_some() {
            // A runner thread is already scheduled; it will pick this up
            *pending = Some(Box::new(task));
            return;
        }

        *pending = Some(Box::new(task));
        drop(pending);

        let pending = Arc::clone(&self.pending);
        let delay = self.delay;
        thread::spawn(move || {
            thread::sleep(delay);
            let task = pending.lock().take();
            if let Some(task) = task {
                task();
            }
        });
    }

    pub fn has_pending(&self) -> bool {
        self.pending.lock().is_some()
    }
}
