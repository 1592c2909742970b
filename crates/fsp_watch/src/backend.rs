//! Uniform watcher-backend interface and backend selection

use fsp_core::{FileChange, LegacyWatcherMode, ProviderConfig, UsePolling};
use globset::{Glob, GlobSetBuilder};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// One registered recursive watch
#[derive(Debug, Clone)]
pub struct WatchRequest {
    pub path: PathBuf,
    pub excludes: Vec<String>,
}

/// Errors from the watch subsystem
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Watcher error: {0}")]
    Notify(#[from] notify::Error),

    #[error("Invalid exclude pattern: {0}")]
    Glob(#[from] globset::Error),
}

/// Batch delivery of settled changes
pub type ChangeHandler = Arc<dyn Fn(Vec<FileChange>) + Send + Sync>;

/// Backend log messages, routed to the log service and the error emitter
#[derive(Debug, Clone)]
pub struct WatcherMessage {
    pub level: MessageLevel,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Trace,
    Warn,
    Error,
}

pub type LogHandler = Arc<dyn Fn(WatcherMessage) + Send + Sync>;

/// What every backend implements
///
/// Backends are constructed with the initial folder list plus the change
/// and log handlers; `watch` reconfigures against a full new list (the
/// backend diffs), and dropping the backend disposes it.
pub trait WatcherBackend: Send {
    fn watch(&mut self, folders: &[WatchRequest]) -> Result<(), WatchError>;
    fn set_verbose_logging(&mut self, verbose: bool);
}

/// Construction options beyond the folder list
#[derive(Debug, Clone)]
pub struct BackendOptions {
    pub polling_interval: Duration,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            polling_interval: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Polling,
    Legacy,
    Efficient,
}

/// Pick a backend for the given folder list
///
/// Polling wins when forced (outright or by a folder matching the polling
/// globs). Otherwise the legacy tri-state applies; when unset, legacy is
/// used for single-folder lists on the stable channel only.
pub fn select_backend_kind(config: &ProviderConfig, folders: &[WatchRequest]) -> BackendKind {
    match &config.watcher.use_polling {
        UsePolling::Enabled(true) => return BackendKind::Polling,
        UsePolling::Enabled(false) => {}
        UsePolling::Globs(globs) => {
            if polling_globs_match(globs, folders) {
                return BackendKind::Polling;
            }
        }
    }

    let use_legacy = match config.legacy_watcher {
        Some(LegacyWatcherMode::On) => true,
        Some(LegacyWatcherMode::Off) => false,
        None => folders.len() == 1 && config.product_channel == "stable",
    };

    if use_legacy {
        BackendKind::Legacy
    } else {
        BackendKind::Efficient
    }
}

/// One backend serves every folder, so any match forces polling for all
fn polling_globs_match(globs: &[String], folders: &[WatchRequest]) -> bool {
    if globs.is_empty() {
        return false;
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in globs {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => {
                tracing::warn!("Ignoring invalid polling glob '{}': {}", pattern, e);
            }
        }
    }

    match builder.build() {
        Ok(set) => folders.iter().any(|f| set.is_match(&f.path)),
        Err(e) => {
            tracing::warn!("Failed to build polling glob set: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsp_core::WatcherConfig;

    fn folders(paths: &[&str]) -> Vec<WatchRequest> {
        paths
            .iter()
            .map(|p| WatchRequest {
                path: PathBuf::from(p),
                excludes: Vec::new(),
            })
            .collect()
    }

    #[test]
    fn test_polling_forced() {
        let config = ProviderConfig {
            watcher: WatcherConfig {
                use_polling: UsePolling::Enabled(true),
                ..WatcherConfig::default()
            },
            ..ProviderConfig::default()
        };
        assert_eq!(
            select_backend_kind(&config, &folders(&["/a", "/b"])),
            BackendKind::Polling
        );
    }

    #[test]
    fn test_polling_by_glob() {
        let config = ProviderConfig {
            watcher: WatcherConfig {
                use_polling: UsePolling::Globs(vec!["/mnt/**".to_string()]),
                ..WatcherConfig::default()
            },
            ..ProviderConfig::default()
        };
        assert_eq!(
            select_backend_kind(&config, &folders(&["/mnt/share"])),
            BackendKind::Polling
        );
        assert_ne!(
            select_backend_kind(&config, &folders(&["/home/me"])),
            BackendKind::Polling
        );
    }

    #[test]
    fn test_legacy_tristate() {
        let mut config = ProviderConfig::default();

        config.legacy_watcher = Some(LegacyWatcherMode::On);
        assert_eq!(
            select_backend_kind(&config, &folders(&["/a", "/b"])),
            BackendKind::Legacy
        );

        config.legacy_watcher = Some(LegacyWatcherMode::Off);
        assert_eq!(
            select_backend_kind(&config, &folders(&["/a"])),
            BackendKind::Efficient
        );
    }

    #[test]
    fn test_legacy_heuristic_single_folder_stable() {
        let config = ProviderConfig::default();
        assert_eq!(config.product_channel, "stable");

        assert_eq!(
            select_backend_kind(&config, &folders(&["/a"])),
            BackendKind::Legacy
        );
        assert_eq!(
            select_backend_kind(&config, &folders(&["/a", "/b"])),
            BackendKind::Efficient
        );

        let insiders = ProviderConfig {
            product_channel: "insider".to_string(),
            ..ProviderConfig::default()
        };
        assert_eq!(
            select_backend_kind(&insiders, &folders(&["/a"])),
            BackendKind::Efficient
        );
    }
}
