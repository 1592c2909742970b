//! Log service with a dynamic level and change notifications

use fsp_core::{Emitter, Subscription};
use parking_lot::RwLock;

/// Severity levels, ordered from most to least verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

/// The logging sink handed to the provider and the watch subsystem
///
/// Messages below the current level are dropped; level changes are
/// observable so consumers (watcher backends) can toggle verbose modes
/// dynamically.
pub struct LogService {
    level: RwLock<LogLevel>,
    level_changed: Emitter<LogLevel>,
}

impl LogService {
    pub fn new(level: LogLevel) -> Self {
        Self {
            level: RwLock::new(level),
            level_changed: Emitter::new(),
        }
    }

    pub fn get_level(&self) -> LogLevel {
        *self.level.read()
    }

    pub fn set_level(&self, level: LogLevel) {
        {
            let mut current = self.level.write();
            if *current == level {
                return;
            }
            *current = level;
        }
        self.level_changed.emit(&level);
    }

    pub fn on_did_change_log_level(
        &self,
        listener: impl Fn(&LogLevel) + Send + Sync + 'static,
    ) -> Subscription {
        self.level_changed.subscribe(listener)
    }

    pub fn trace(&self, message: &str) {
        if self.get_level() <= LogLevel::Trace {
            tracing::trace!("{}", message);
        }
    }

    pub fn debug(&self, message: &str) {
        if self.get_level() <= LogLevel::Debug {
            tracing::debug!("{}", message);
        }
    }

    pub fn info(&self, message: &str) {
        if self.get_level() <= LogLevel::Info {
            tracing::info!("{}", message);
        }
    }

    pub fn warn(&self, message: &str) {
        if self.get_level() <= LogLevel::Warn {
            tracing::warn!("{}", message);
        }
    }

    pub fn error(&self, message: &str) {
        if self.get_level() <= LogLevel::Error {
            tracing::error!("{}", message);
        }
    }
}

impl Default for LogService {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Error < LogLevel::Off);
    }

    #[test]
    fn test_change_notification() {
        let service = LogService::new(LogLevel::Info);
        let seen = Arc::new(AtomicUsize::new(0));

        let seen_inner = Arc::clone(&seen);
        let _sub = service.on_did_change_log_level(move |level| {
            assert_eq!(*level, LogLevel::Trace);
            seen_inner.fetch_add(1, Ordering::SeqCst);
        });

        service.set_level(LogLevel::Trace);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(service.get_level(), LogLevel::Trace);
    }

    #[test]
    fn test_same_level_does_not_notify() {
        let service = LogService::new(LogLevel::Info);
        let seen = Arc::new(AtomicUsize::new(0));

        let seen_inner = Arc::clone(&seen);
        let _sub = service.on_did_change_log_level(move |_| {
            seen_inner.fetch_add(1, Ordering::SeqCst);
        });

        service.set_level(LogLevel::Info);
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }
}
