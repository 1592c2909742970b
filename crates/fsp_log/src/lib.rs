//! Logging & Observability Module
//!
//! Provides the log service consumed by the provider (dynamic level with
//! change notifications) and the structured-logging bootstrap.

mod logging;
mod service;

pub use logging::{cleanup_old_logs, init_logging, LogGuard};
pub use service::{LogLevel, LogService};

use directories::ProjectDirs;
use std::path::PathBuf;

/// Get the log directory
pub fn log_dir() -> PathBuf {
    ProjectDirs::from("com", "DiskProvider", "DiskProvider")
        .map(|dirs| dirs.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("./logs"))
}

/// Initialize all observability features
///
/// The returned guard must be held for the lifetime of the process.
pub fn init() -> anyhow::Result<LogGuard> {
    init_logging(None)
}
