//! Streaming read support

use fsp_core::FsError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;

/// Cooperative cancellation for streaming reads
///
/// Clones share the flag; cancelling any clone halts the pump.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// A sequence of byte chunks pumped from a file on a worker thread
///
/// Iterate to receive chunks; the stream ends when the file is exhausted,
/// the pump errors, or the cancellation token fires. Dropping the stream
/// early also stops the pump.
pub struct ReadFileStream {
    pub(crate) rx: Receiver<Result<Vec<u8>, FsError>>,
}

impl Iterator for ReadFileStream {
    type Item = Result<Vec<u8>, FsError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rx.recv().ok()
    }
}

impl ReadFileStream {
    /// Drain the stream into one buffer, stopping at the first error
    pub fn read_to_end(self) -> Result<Vec<u8>, FsError> {
        let mut out = Vec::new();
        for chunk in self {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }
}
