//! Tracing bootstrap for the provider process

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// File name prefix of the rolling provider log; the appender suffixes
/// the roll date onto it
const LOG_FILE_PREFIX: &str = "provider.log";

/// Keeps the non-blocking log writer alive
///
/// Dropping the guard flushes buffered records and stops the background
/// worker, so hold it for the lifetime of the process.
pub struct LogGuard {
    _worker: WorkerGuard,
}

/// Initialize the tracing pipeline
///
/// Records roll daily into `directory` (the platform log dir when `None`)
/// as JSON; debug builds additionally get compact output on stderr. Fails
/// if a subscriber is already installed.
pub fn init_logging(directory: Option<PathBuf>) -> anyhow::Result<LogGuard> {
    let directory = directory.unwrap_or_else(super::log_dir);
    std::fs::create_dir_all(&directory)?;

    let appender = RollingFileAppender::new(Rotation::DAILY, &directory, LOG_FILE_PREFIX);
    let (writer, worker) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console =
        cfg!(debug_assertions).then(|| fmt::layer().compact().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_writer(writer))
        .with(console)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::info!("Logging to {:?}", directory);
    Ok(LogGuard { _worker: worker })
}

/// Remove rolled provider logs older than `retention_days` from `directory`
///
/// Rolled files carry the date as a suffix, not a `.log` extension, so
/// candidates are matched by prefix. Returns how many files were removed.
pub fn cleanup_old_logs(directory: &Path, retention_days: u32) -> anyhow::Result<usize> {
    if !directory.exists() {
        return Ok(0);
    }

    let threshold =
        SystemTime::now() - Duration::from_secs(u64::from(retention_days) * 24 * 60 * 60);
    let mut removed = 0;

    for entry in std::fs::read_dir(directory)? {
        let entry = entry?;
        if !entry.file_name().to_string_lossy().starts_with(LOG_FILE_PREFIX) {
            continue;
        }

        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        if modified < threshold && std::fs::remove_file(entry.path()).is_ok() {
            removed += 1;
            tracing::debug!("Removed old log {:?}", entry.path());
        }
    }

    Ok(removed)
}
