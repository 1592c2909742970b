//! Per-path non-recursive watcher

use crate::backend::{ChangeHandler, LogHandler, WatchError};
use crate::backends::{spawn_event_pump, PumpState};
use fsp_core::Subscription;
use fsp_log::{LogLevel, LogService};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::mpsc;

/// Watches a single path without descending into children
///
/// Unlike the recursive multiplexer this is one native watcher per
/// request; dropping the instance tears down the watcher, its pump thread
/// and the log-level subscription.
pub struct NonRecursiveWatcher {
    _watcher: RecommendedWatcher,
    _level_sub: Subscription,
}

impl NonRecursiveWatcher {
    pub fn new(
        path: &Path,
        on_change: ChangeHandler,
        on_log: LogHandler,
        log: &LogService,
    ) -> Result<Self, WatchError> {
        let (raw_tx, raw_rx) = mpsc::channel::<notify::Result<notify::Event>>();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = raw_tx.send(res);
            },
            Config::default(),
        )?;
        watcher.watch(path, RecursiveMode::NonRecursive)?;

        let state = PumpState::new(&[], log.get_level() == LogLevel::Trace)?;
        spawn_event_pump(raw_rx, on_change, on_log, &state);

        let verbose = std::sync::Arc::clone(&state.verbose);
        let level_sub = log.on_did_change_log_level(move |level| {
            verbose.store(*level == LogLevel::Trace, Ordering::Relaxed);
        });

        tracing::debug!("Watching (non-recursive): {:?}", path);

        Ok(Self {
            _watcher: watcher,
            _level_sub: level_sub,
        })
    }
}
