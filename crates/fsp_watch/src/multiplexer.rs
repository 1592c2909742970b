//! Recursive watch multiplexer
//!
//! Aggregates any number of recursive watch requests onto a single backend
//! watcher. Requests form an insertion-ordered multiset (duplicates are
//! permitted and independently disposable); reconfiguration is coalesced
//! through a zero-delay throttled delayer so a burst of watch/unwatch
//! calls produces exactly one backend reconfiguration.

use crate::backend::{
    select_backend_kind, BackendOptions, ChangeHandler, LogHandler, WatchError, WatchRequest,
    WatcherBackend,
};
use crate::backends::create_backend;
use fsp_core::{Disposable, ProviderConfig, Subscription, ThrottledDelayer};
use fsp_log::{LogLevel, LogService};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

type BackendFactory =
    Box<dyn Fn(&[WatchRequest], bool) -> Result<Box<dyn WatcherBackend>, WatchError> + Send + Sync>;

pub struct WatchMultiplexer {
    inner: Arc<Inner>,
}

struct Inner {
    log: Arc<LogService>,
    requests: Mutex<Vec<(u64, WatchRequest)>>,
    next_id: AtomicU64,
    backend: Mutex<Option<Box<dyn WatcherBackend>>>,
    level_sub: Mutex<Option<Subscription>>,
    delayer: ThrottledDelayer,
    factory: BackendFactory,
}

impl WatchMultiplexer {
    pub fn new(
        config: &ProviderConfig,
        log: Arc<LogService>,
        on_change: ChangeHandler,
        on_log: LogHandler,
    ) -> Self {
        let options = BackendOptions {
            polling_interval: Duration::from_millis(config.watcher.polling_interval_ms),
        };
        let config = config.clone();
        let factory: BackendFactory = Box::new(move |folders, verbose| {
            let kind = select_backend_kind(&config, folders);
            tracing::debug!("Starting {:?} watcher backend for {} folder(s)", kind, folders.len());
            create_backend(
                kind,
                folders,
                on_change.clone(),
                on_log.clone(),
                verbose,
                &options,
            )
        });

        Self::with_factory(log, factory)
    }

    fn with_factory(log: Arc<LogService>, factory: BackendFactory) -> Self {
        Self {
            inner: Arc::new(Inner {
                log,
                requests: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                backend: Mutex::new(None),
                level_sub: Mutex::new(None),
                delayer: ThrottledDelayer::new(Duration::ZERO),
                factory,
            }),
        }
    }

    /// Register a recursive watch; the disposable removes exactly this
    /// registration, leaving any duplicate of the same path in place
    pub fn watch(&self, path: PathBuf, excludes: Vec<String>) -> Disposable {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .requests
            .lock()
            .push((id, WatchRequest { path, excludes }));
        Inner::schedule_refresh(&self.inner);

        let weak = Arc::downgrade(&self.inner);
        Disposable::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.requests.lock().retain(|(rid, _)| *rid != id);
                Inner::schedule_refresh(&inner);
            }
        })
    }

    #[cfg(test)]
    fn request_count(&self) -> usize {
        self.inner.requests.lock().len()
    }

    #[cfg(test)]
    fn has_backend(&self) -> bool {
        self.inner.backend.lock().is_some()
    }
}

impl Inner {
    fn schedule_refresh(inner: &Arc<Inner>) {
        let weak = Arc::downgrade(inner);
        inner.delayer.trigger(move || {
            if let Some(inner) = weak.upgrade() {
                Inner::refresh(&inner);
            }
        });
    }

    fn refresh(inner: &Arc<Inner>) {
        let folders: Vec<WatchRequest> = inner
            .requests
            .lock()
            .iter()
            .map(|(_, request)| request.clone())
            .collect();

        let mut backend = inner.backend.lock();
        if let Some(active) = backend.as_mut() {
            // The backend diffs the full list itself. An emptied list does
            // not tear the backend down; once created it lives until the
            // provider is dropped.
            if let Err(e) = active.watch(&folders) {
                inner
                    .log
                    .error(&format!("Failed to reconfigure watcher backend: {}", e));
            }
            return;
        }

        if folders.is_empty() {
            return;
        }

        let verbose = inner.log.get_level() == LogLevel::Trace;
        match (inner.factory)(&folders, verbose) {
            Ok(created) => {
                *backend = Some(created);
                drop(backend);

                let weak = Arc::downgrade(inner);
                let sub = inner.log.on_did_change_log_level(move |level| {
                    if let Some(inner) = weak.upgrade() {
                        if let Some(backend) = inner.backend.lock().as_mut() {
                            backend.set_verbose_logging(*level == LogLevel::Trace);
                        }
                    }
                });
                *inner.level_sub.lock() = Some(sub);
            }
            Err(e) => {
                inner
                    .log
                    .error(&format!("Failed to start watcher backend: {}", e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    struct MockBackend {
        folders: Arc<Mutex<Vec<WatchRequest>>>,
        verbose: Arc<Mutex<bool>>,
    }

    impl WatcherBackend for MockBackend {
        fn watch(&mut self, folders: &[WatchRequest]) -> Result<(), WatchError> {
            *self.folders.lock() = folders.to_vec();
            Ok(())
        }

        fn set_verbose_logging(&mut self, verbose: bool) {
            *self.verbose.lock() = verbose;
        }
    }

    struct Harness {
        multiplexer: WatchMultiplexer,
        constructions: Arc<AtomicUsize>,
        folders: Arc<Mutex<Vec<WatchRequest>>>,
        verbose: Arc<Mutex<bool>>,
        log: Arc<LogService>,
    }

    fn harness() -> Harness {
        let constructions = Arc::new(AtomicUsize::new(0));
        let folders = Arc::new(Mutex::new(Vec::new()));
        let verbose = Arc::new(Mutex::new(false));
        let log = Arc::new(LogService::new(LogLevel::Info));

        let constructions_inner = Arc::clone(&constructions);
        let folders_inner = Arc::clone(&folders);
        let verbose_inner = Arc::clone(&verbose);
        let factory: BackendFactory = Box::new(move |initial, verbose| {
            constructions_inner.fetch_add(1, Ordering::SeqCst);
            *folders_inner.lock() = initial.to_vec();
            *verbose_inner.lock() = verbose;
            Ok(Box::new(MockBackend {
                folders: Arc::clone(&folders_inner),
                verbose: Arc::clone(&verbose_inner),
            }))
        });

        Harness {
            multiplexer: WatchMultiplexer::with_factory(Arc::clone(&log), factory),
            constructions,
            folders,
            verbose,
            log,
        }
    }

    fn settle() {
        thread::sleep(Duration::from_millis(100));
    }

    #[test]
    fn test_burst_constructs_backend_once() {
        let h = harness();

        let _a = h.multiplexer.watch(PathBuf::from("/one"), Vec::new());
        let _b = h.multiplexer.watch(PathBuf::from("/two"), Vec::new());
        let _c = h.multiplexer.watch(PathBuf::from("/three"), Vec::new());
        settle();

        assert_eq!(h.constructions.load(Ordering::SeqCst), 1);
        assert_eq!(h.folders.lock().len(), 3);
    }

    #[test]
    fn test_duplicates_are_independent() {
        let h = harness();

        let a = h.multiplexer.watch(PathBuf::from("/same"), Vec::new());
        let _b = h.multiplexer.watch(PathBuf::from("/same"), Vec::new());
        settle();
        assert_eq!(h.multiplexer.request_count(), 2);

        a.dispose();
        settle();
        assert_eq!(h.multiplexer.request_count(), 1);
        assert_eq!(h.folders.lock().len(), 1);
    }

    #[test]
    fn test_backend_survives_emptying() {
        let h = harness();

        let a = h.multiplexer.watch(PathBuf::from("/only"), Vec::new());
        settle();
        assert!(h.multiplexer.has_backend());

        a.dispose();
        settle();
        assert!(h.multiplexer.has_backend());
        assert!(h.folders.lock().is_empty());
        assert_eq!(h.constructions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_log_level_propagates_to_backend() {
        let h = harness();

        let _a = h.multiplexer.watch(PathBuf::from("/x"), Vec::new());
        settle();
        assert!(!*h.verbose.lock());

        h.log.set_level(LogLevel::Trace);
        assert!(*h.verbose.lock());

        h.log.set_level(LogLevel::Info);
        assert!(!*h.verbose.lock());
    }

    #[test]
    fn test_no_backend_without_requests() {
        let h = harness();
        settle();
        assert!(!h.multiplexer.has_backend());
        assert_eq!(h.constructions.load(Ordering::SeqCst), 0);
    }
}
