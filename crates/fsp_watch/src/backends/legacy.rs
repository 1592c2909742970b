//! Legacy backend: one platform watcher per folder

use super::{build_exclude_set, spawn_event_pump, PumpState};
use crate::backend::{
    ChangeHandler, LogHandler, MessageLevel, WatchError, WatchRequest, WatcherBackend,
    WatcherMessage,
};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::mpsc;

/// The older per-folder arrangement
///
/// Each folder gets its own platform watcher (inotify on Linux, FSEvents
/// on macOS, ReadDirectoryChangesW on Windows), all feeding one pump.
/// Kept for the stable-channel single-folder heuristic.
pub struct LegacyWatcher {
    watchers: HashMap<PathBuf, RecommendedWatcher>,
    raw_tx: mpsc::Sender<notify::Result<notify::Event>>,
    state: PumpState,
    on_log: LogHandler,
}

impl LegacyWatcher {
    pub fn new(
        folders: &[WatchRequest],
        on_change: ChangeHandler,
        on_log: LogHandler,
        verbose: bool,
    ) -> Result<Self, WatchError> {
        let (raw_tx, raw_rx) = mpsc::channel::<notify::Result<notify::Event>>();

        let state = PumpState::new(folders, verbose)?;
        spawn_event_pump(raw_rx, on_change, on_log.clone(), &state);

        let mut backend = Self {
            watchers: HashMap::new(),
            raw_tx,
            state,
            on_log,
        };
        backend.watch(folders)?;

        Ok(backend)
    }

    fn start_watcher(&self, path: &PathBuf) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.raw_tx.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;
        watcher.watch(path, RecursiveMode::Recursive)?;
        Ok(watcher)
    }
}

impl WatcherBackend for LegacyWatcher {
    fn watch(&mut self, folders: &[WatchRequest]) -> Result<(), WatchError> {
        *self.state.excludes.write() = build_exclude_set(folders)?;

        let target: Vec<PathBuf> = folders.iter().map(|f| f.path.clone()).collect();

        self.watchers.retain(|path, _| target.contains(path));

        for path in target {
            if self.watchers.contains_key(&path) {
                continue;
            }
            match self.start_watcher(&path) {
                Ok(watcher) => {
                    self.watchers.insert(path, watcher);
                }
                Err(e) => {
                    (self.on_log)(WatcherMessage {
                        level: MessageLevel::Warn,
                        text: format!("Failed to watch {:?}: {}", path, e),
                    });
                }
            }
        }

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

    #[test]
    fn test_one_watcher_per_folder() {
        let dir_a = tempfile::TempDir::new().unwrap();
        let dir_b = tempfile::TempDir::new().unwrap();

        let folder = |path: &std::path::Path| WatchRequest {
            path: path.to_path_buf(),
            excludes: Vec::new(),
        };

        let mut backend = LegacyWatcher::new(
            &[folder(dir_a.path()), folder(dir_b.path())],
            Arc::new(|_| {}),
            Arc::new(|_| {}),
            false,
        )
        .unwrap();
        assert_eq!(backend.watchers.len(), 2);

        backend.watch(&[folder(dir_a.path())]).unwrap();
        assert_eq!(backend.watchers.len(), 1);
        assert!(backend.watchers.contains_key(dir_a.path()));
    }
}
