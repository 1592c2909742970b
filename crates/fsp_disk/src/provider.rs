//! The provider object and its event/watch wiring

use crate::handles::HandleRegistry;
use fsp_core::{
    Capabilities, Disposable, Emitter, FileChange, FileResource, FsError, ProviderConfig, Result,
    Subscription, WatchOptions,
};
use fsp_log::LogService;
use fsp_watch::{
    ChangeHandler, LogHandler, MessageLevel, NonRecursiveWatcher, WatchMultiplexer, WatcherMessage,
};
use once_cell::sync::OnceCell;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Filesystem provider for the local disk
///
/// One instance is created at workbench start and lives until shutdown;
/// dropping it releases all open descriptors, the watcher backend and the
/// event emitters.
pub struct DiskFileSystemProvider {
    pub(crate) config: ProviderConfig,
    pub(crate) log: Arc<LogService>,
    pub(crate) registry: HandleRegistry,

    /// Sticky: one failed `sync_data` disables flush-on-close for good
    pub(crate) can_flush: AtomicBool,

    capabilities: OnceCell<Capabilities>,

    changes: Arc<Emitter<Vec<FileChange>>>,
    errors: Arc<Emitter<String>>,
    capabilities_changed: Emitter<()>,

    change_handler: ChangeHandler,
    log_handler: LogHandler,
    multiplexer: WatchMultiplexer,
}

impl DiskFileSystemProvider {
    pub fn new(config: ProviderConfig, log: Arc<LogService>) -> Self {
        let changes: Arc<Emitter<Vec<FileChange>>> = Arc::new(Emitter::new());
        let errors: Arc<Emitter<String>> = Arc::new(Emitter::new());

        let change_handler: ChangeHandler = {
            let changes = Arc::clone(&changes);
            Arc::new(move |batch: Vec<FileChange>| changes.emit(&batch))
        };
        let log_handler = watcher_log_handler(Arc::clone(&log), Arc::clone(&errors));

        let multiplexer = WatchMultiplexer::new(
            &config,
            Arc::clone(&log),
            change_handler.clone(),
            log_handler.clone(),
        );

        Self {
            config,
            log,
            registry: HandleRegistry::new(),
            can_flush: AtomicBool::new(true),
            capabilities: OnceCell::new(),
            changes,
            errors,
            capabilities_changed: Emitter::new(),
            change_handler,
            log_handler,
            multiplexer,
        }
    }

    /// Create a provider with default configuration
    pub fn with_defaults(log: Arc<LogService>) -> Self {
        Self::new(ProviderConfig::default(), log)
    }

    /// The advertised capability set, computed on first read
    pub fn capabilities(&self) -> Capabilities {
        *self.capabilities.get_or_init(Capabilities::local_disk)
    }

    pub fn on_did_change_file(
        &self,
        listener: impl Fn(&Vec<FileChange>) + Send + Sync + 'static,
    ) -> Subscription {
        self.changes.subscribe(listener)
    }

    pub fn on_did_error_occur(
        &self,
        listener: impl Fn(&String) + Send + Sync + 'static,
    ) -> Subscription {
        self.errors.subscribe(listener)
    }

    /// Never fired by this provider; the capability set is static
    pub fn on_did_change_capabilities(
        &self,
        listener: impl Fn(&()) + Send + Sync + 'static,
    ) -> Subscription {
        self.capabilities_changed.subscribe(listener)
    }

    /// Start watching a resource
    ///
    /// Recursive requests are multiplexed onto the shared backend watcher;
    /// non-recursive requests get their own lightweight watcher. The
    /// returned disposable stops exactly this request.
    pub fn watch(&self, resource: &FileResource, opts: &WatchOptions) -> Result<Disposable> {
        if opts.recursive {
            return Ok(self
                .multiplexer
                .watch(resource.to_path_buf(), opts.excludes.clone()));
        }

        let watcher = NonRecursiveWatcher::new(
            resource.as_path(),
            self.change_handler.clone(),
            self.log_handler.clone(),
            &self.log,
        )
        .map_err(|e| FsError::Unknown(format!("Unable to watch '{}': {}", resource, e)))?;

        Ok(Disposable::new(move || drop(watcher)))
    }
}

/// Route backend log messages to the log service, and errors additionally
/// to the error emitter
fn watcher_log_handler(log: Arc<LogService>, errors: Arc<Emitter<String>>) -> LogHandler {
    Arc::new(move |message: WatcherMessage| match message.level {
        MessageLevel::Trace => log.trace(&message.text),
        MessageLevel::Warn => log.warn(&message.text),
        MessageLevel::Error => {
            log.error(&message.text);
            errors.emit(&message.text);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> DiskFileSystemProvider {
        DiskFileSystemProvider::with_defaults(Arc::new(LogService::default()))
    }

    #[test]
    fn test_capabilities_are_stable() {
        let p = provider();
        let first = p.capabilities();
        assert_eq!(first, p.capabilities());
        assert_eq!(first, Capabilities::local_disk());
    }

    #[test]
    fn test_non_recursive_watch_disposes() {
        let dir = tempfile::TempDir::new().unwrap();
        let p = provider();

        let watch = p
            .watch(
                &FileResource::new(dir.path()),
                &WatchOptions {
                    recursive: false,
                    excludes: Vec::new(),
                },
            )
            .unwrap();
        watch.dispose();
    }

    #[test]
    fn test_non_recursive_watch_missing_path_errors() {
        let p = provider();
        let result = p.watch(
            &FileResource::new("/definitely/not/here"),
            &WatchOptions {
                recursive: false,
                excludes: Vec::new(),
            },
        );
        assert!(matches!(result, Err(FsError::Unknown(_))));
    }

    #[test]
    fn test_recursive_watch_registers() {
        let dir = tempfile::TempDir::new().unwrap();
        let p = provider();

        let watch = p
            .watch(
                &FileResource::new(dir.path()),
                &WatchOptions {
                    recursive: true,
                    excludes: vec!["**/target/**".to_string()],
                },
            )
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(100));
        watch.dispose();
    }
}
