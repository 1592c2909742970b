//! Efficient backend: one shared recursive watcher for all folders

use super::{build_exclude_set, reconcile_watches, spawn_event_pump, PumpState};
use crate::backend::{
    ChangeHandler, LogHandler, WatchError, WatchRequest, WatcherBackend,
};
use notify::{Config, RecommendedWatcher, Watcher};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::mpsc;

/// The cross-platform multiplexing backend
///
/// A single native watcher instance observes every registered folder;
/// reconfiguration diffs the folder list instead of rebuilding the
/// watcher.
pub struct EfficientWatcher {
    watcher: RecommendedWatcher,
    watched: Vec<PathBuf>,
    state: PumpState,
    on_log: LogHandler,
}

impl EfficientWatcher {
    pub fn new(
        folders: &[WatchRequest],
        on_change: ChangeHandler,
        on_log: LogHandler,
        verbose: bool,
    ) -> Result<Self, WatchError> {
        let (raw_tx, raw_rx) = mpsc::channel::<notify::Result<notify::Event>>();

        let watcher = RecommendedWatcher::new(
            move |res| {
                let _ = raw_tx.send(res);
            },
            Config::default(),
        )?;

        let state = PumpState::new(folders, verbose)?;
        spawn_event_pump(raw_rx, on_change, on_log.clone(), &state);

        let mut backend = Self {
            watcher,
            watched: Vec::new(),
            state,
            on_log,
        };
        backend.watch(folders)?;

        Ok(backend)
    }
}

impl WatcherBackend for EfficientWatcher {
    fn watch(&mut self, folders: &[WatchRequest]) -> Result<(), WatchError> {
        *self.state.excludes.write() = build_exclude_set(folders)?;
        reconcile_watches(&mut self.watcher, &mut self.watched, folders, &self.on_log);
        Ok(())
    }

    fn set_verbose_logging(&mut self, verbose: bool) {
        self.state.verbose.store(verbose, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn noop_handlers() -> (ChangeHandler, LogHandler) {
        (Arc::new(|_| {}), Arc::new(|_| {}))
    }

    #[test]
    fn test_watch_and_reconfigure() {
        let dir_a = tempfile::TempDir::new().unwrap();
        let dir_b = tempfile::TempDir::new().unwrap();
        let (on_change, on_log) = noop_handlers();

        let folder = |path: &std::path::Path| WatchRequest {
            path: path.to_path_buf(),
            excludes: Vec::new(),
        };

        let mut backend =
            EfficientWatcher::new(&[folder(dir_a.path())], on_change, on_log, false).unwrap();
        assert_eq!(backend.watched.len(), 1);

        backend
            .watch(&[folder(dir_a.path()), folder(dir_b.path())])
            .unwrap();
        assert_eq!(backend.watched.len(), 2);

        backend.watch(&[folder(dir_b.path())]).unwrap();
        assert_eq!(backend.watched, vec![dir_b.path().to_path_buf()]);
    }

    #[test]
    fn test_empty_list_keeps_backend_alive() {
        let dir = tempfile::TempDir::new().unwrap();
        let (on_change, on_log) = noop_handlers();

        let mut backend = EfficientWatcher::new(
            &[WatchRequest {
                path: dir.path().to_path_buf(),
                excludes: Vec::new(),
            }],
            on_change,
            on_log,
            false,
        )
        .unwrap();

        backend.watch(&[]).unwrap();
        assert!(backend.watched.is_empty());
    }
}
