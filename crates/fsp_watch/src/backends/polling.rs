//! Polling backend for filesystems without usable change notification

use super::{build_exclude_set, reconcile_watches, spawn_event_pump, PumpState};
use crate::backend::{
    BackendOptions, ChangeHandler, LogHandler, WatchError, WatchRequest, WatcherBackend,
};
use notify::{Config, PollWatcher};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::mpsc;

/// Scans watched trees on a fixed interval
///
/// Used for network mounts and other locations where native notification
/// is unreliable; the interval comes from `watcher.polling_interval_ms`.
pub struct PollingWatcher {
    watcher: PollWatcher,
    watched: Vec<PathBuf>,
    state: PumpState,
    on_log: LogHandler,
}

impl PollingWatcher {
    pub fn new(
        folders: &[WatchRequest],
        on_change: ChangeHandler,
        on_log: LogHandler,
        verbose: bool,
        options: &BackendOptions,
    ) -> Result<Self, WatchError> {
        let (raw_tx, raw_rx) = mpsc::channel::<notify::Result<notify::Event>>();

        let watcher = PollWatcher::new(
            move |res| {
                let _ = raw_tx.send(res);
            },
            Config::default().with_poll_interval(options.polling_interval),
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

impl WatcherBackend for PollingWatcher {
    fn watch(&mut self, folders: &[WatchRequest]) -> Result<(), WatchError> {
        *self.state.excludes.write() = build_exclude_set(folders)?;
        reconcile_watches(&mut self.watcher, &mut self.watched, folders, &self.on_log);
        Ok(())
    }

    fn set_verbose_logging(&mut self, verbose: bool) {
        self.state.verbose.store(verbose, Ordering::Relaxed);
    }
}
