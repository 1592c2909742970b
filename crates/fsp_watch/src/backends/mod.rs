//! Watcher backend implementations over `notify`

mod efficient;
mod legacy;
mod polling;

pub use efficient::EfficientWatcher;
pub use legacy::LegacyWatcher;
pub use polling::PollingWatcher;

use crate::backend::{
    BackendKind, BackendOptions, ChangeHandler, LogHandler, MessageLevel, WatchError,
    WatchRequest, WatcherBackend, WatcherMessage,
};
use fsp_core::{FileChange, FileChangeKind};
use globset::{Glob, GlobSet, GlobSetBuilder};
use notify::{Event, EventKind};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

/// How long a path must stay quiet before its change is dispatched
const DEBOUNCE: Duration = Duration::from_millis(50);

/// Poll interval of the settle loop
const SETTLE_TICK: Duration = Duration::from_millis(25);

/// Construct the backend of the given kind, already watching `folders`
pub fn create_backend(
    kind: BackendKind,
    folders: &[WatchRequest],
    on_change: ChangeHandler,
    on_log: LogHandler,
    verbose: bool,
    options: &BackendOptions,
) -> Result<Box<dyn WatcherBackend>, WatchError> {
    match kind {
        BackendKind::Polling => Ok(Box::new(PollingWatcher::new(
            folders, on_change, on_log, verbose, options,
        )?)),
        BackendKind::Legacy => Ok(Box::new(LegacyWatcher::new(
            folders, on_change, on_log, verbose,
        )?)),
        BackendKind::Efficient => Ok(Box::new(EfficientWatcher::new(
            folders, on_change, on_log, verbose,
        )?)),
    }
}

/// Compile the exclude globs of every folder into one matcher
pub(crate) fn build_exclude_set(folders: &[WatchRequest]) -> Result<GlobSet, WatchError> {
    let mut builder = GlobSetBuilder::new();
    for folder in folders {
        for pattern in &folder.excludes {
            builder.add(Glob::new(pattern)?);
        }
    }
    Ok(builder.build()?)
}

/// Shared state between a backend and its event pump thread
pub(crate) struct PumpState {
    pub excludes: Arc<RwLock<GlobSet>>,
    pub verbose: Arc<AtomicBool>,
}

impl PumpState {
    pub fn new(folders: &[WatchRequest], verbose: bool) -> Result<Self, WatchError> {
        Ok(Self {
            excludes: Arc::new(RwLock::new(build_exclude_set(folders)?)),
            verbose: Arc::new(AtomicBool::new(verbose)),
        })
    }
}

/// Debounce loop - consolidates rapid raw events into settled batches
///
/// Runs until every sender feeding `raw_rx` is gone, which happens when
/// the owning backend (and with it the native watcher) is dropped.
pub(crate) fn spawn_event_pump(
    raw_rx: mpsc::Receiver<notify::Result<Event>>,
    on_change: ChangeHandler,
    on_log: LogHandler,
    state: &PumpState,
) {
    let excludes = Arc::clone(&state.excludes);
    let verbose = Arc::clone(&state.verbose);

    thread::spawn(move || {
        let mut pending: HashMap<PathBuf, (FileChangeKind, Instant)> = HashMap::new();

        loop {
            let mut disconnected = false;
            match raw_rx.recv_timeout(SETTLE_TICK) {
                Ok(Ok(event)) => {
                    if let Some(kind) = map_event_kind(&event.kind) {
                        let matcher = excludes.read();
                        for path in event.paths {
                            if matcher.is_match(&path) {
                                if verbose.load(Ordering::Relaxed) {
                                    on_log(WatcherMessage {
                                        level: MessageLevel::Trace,
                                        text: format!("Excluded change: {:?}", path),
                                    });
                                }
                                continue;
                            }
                            pending.insert(path, (kind, Instant::now()));
                        }
                    }
                }
                Ok(Err(e)) => {
                    on_log(WatcherMessage {
                        level: MessageLevel::Error,
                        text: format!("Watch error: {}", e),
                    });
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    disconnected = true;
                }
            }

            let now = Instant::now();
            let settled: Vec<FileChange> = pending
                .iter()
                .filter(|(_, (_, time))| disconnected || now.duration_since(*time) >= DEBOUNCE)
                .map(|(path, (kind, _))| FileChange {
                    kind: *kind,
                    path: path.clone(),
                })
                .collect();

            if !settled.is_empty() {
                for change in &settled {
                    pending.remove(&change.path);
                }
                if verbose.load(Ordering::Relaxed) {
                    on_log(WatcherMessage {
                        level: MessageLevel::Trace,
                        text: format!("Dispatching {} change(s)", settled.len()),
                    });
                }
                on_change(settled);
            }

            if disconnected {
                break;
            }
        }
    });
}

/// Map a raw notify event class to the portable change kind
pub(crate) fn map_event_kind(kind: &EventKind) -> Option<FileChangeKind> {
    match kind {
        EventKind::Create(_) => Some(FileChangeKind::Created),
        EventKind::Modify(_) => Some(FileChangeKind::Updated),
        EventKind::Remove(_) => Some(FileChangeKind::Deleted),
        _ => None,
    }
}

/// Diff `watched` against the new folder list on a single shared watcher
pub(crate) fn reconcile_watches<W: notify::Watcher>(
    watcher: &mut W,
    watched: &mut Vec<PathBuf>,
    folders: &[WatchRequest],
    on_log: &LogHandler,
) {
    let target: Vec<PathBuf> = folders.iter().map(|f| f.path.clone()).collect();

    for old in watched.iter() {
        if !target.contains(old) {
            if let Err(e) = watcher.unwatch(old) {
                on_log(WatcherMessage {
                    level: MessageLevel::Trace,
                    text: format!("Failed to unwatch {:?}: {}", old, e),
                });
            }
        }
    }

    for new in &target {
        if !watched.contains(new) {
            if let Err(e) = watcher.watch(new, notify::RecursiveMode::Recursive) {
                on_log(WatcherMessage {
                    level: MessageLevel::Warn,
                    text: format!("Failed to watch {:?}: {}", new, e),
                });
            }
        }
    }

    *watched = target;
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    #[test]
    fn test_event_kind_mapping() {
        assert_eq!(
            map_event_kind(&EventKind::Create(CreateKind::File)),
            Some(FileChangeKind::Created)
        );
        assert_eq!(
            map_event_kind(&EventKind::Modify(ModifyKind::Any)),
            Some(FileChangeKind::Updated)
        );
        assert_eq!(
            map_event_kind(&EventKind::Remove(RemoveKind::File)),
            Some(FileChangeKind::Deleted)
        );
        assert_eq!(map_event_kind(&EventKind::Access(notify::event::AccessKind::Any)), None);
    }

    #[test]
    fn test_exclude_set_matches_across_folders() {
        let folders = vec![
            WatchRequest {
                path: PathBuf::from("/a"),
                excludes: vec!["**/node_modules/**".to_string()],
            },
            WatchRequest {
                path: PathBuf::from("/b"),
                excludes: vec!["**/.git/**".to_string()],
            },
        ];
        let set = build_exclude_set(&folders).unwrap();
        assert!(set.is_match("/a/x/node_modules/y.js"));
        assert!(set.is_match("/b/.git/HEAD"));
        assert!(!set.is_match("/a/src/main.rs"));
    }

    #[test]
    fn test_empty_excludes_match_nothing() {
        let folders = vec![WatchRequest {
            path: PathBuf::from("/a"),
            excludes: Vec::new(),
        }];
        let set = build_exclude_set(&folders).unwrap();
        assert!(!set.is_match("/a/file.txt"));
    }
}
