//! Descriptor I/O and the position cache
//!
//! Positional reads and writes that pass an explicit offset cost an extra
//! seek, and some transports fail on seek outright. The registry therefore
//! remembers the last-known offset per descriptor and passes "current
//! position" to the OS whenever the caller's requested offset matches it.

use crate::provider::DiskFileSystemProvider;
use fsp_core::{FileOpenOptions, FileResource, FsError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

const MAX_WRITE_ATTEMPTS: u32 = 3;
const WRITE_RETRY_DELAY: Duration = Duration::from_millis(100);

struct OpenFile {
    file: File,
    path: PathBuf,
}

#[derive(Default)]
struct RegistryInner {
    next_fd: u64,
    files: HashMap<u64, OpenFile>,

    /// Last-known logical offset per descriptor
    pos: HashMap<u64, u64>,

    /// Resources opened for writing; absence means read-only
    writable: HashMap<u64, FileResource>,
}

/// All descriptor state behind one lock, so the paired map updates stay
/// atomic with respect to concurrent operations
pub(crate) struct HandleRegistry {
    inner: Mutex<RegistryInner>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                next_fd: 1,
                ..RegistryInner::default()
            }),
        }
    }

    fn insert(&self, file: File, resource: &FileResource, writable: bool) -> u64 {
        let mut inner = self.inner.lock();
        let fd = inner.next_fd;
        inner.next_fd += 1;

        inner.files.insert(
            fd,
            OpenFile {
                file,
                path: resource.to_path_buf(),
            },
        );
        inner.pos.insert(fd, 0);
        if writable {
            inner.writable.insert(fd, resource.clone());
        }

        fd
    }

    /// Clone the descriptor's file handle (shared kernel cursor) and
    /// normalize the requested offset against the cache
    ///
    /// `None` means "use the current position"; the map lock is released
    /// before the blocking syscall.
    fn prepare(&self, fd: u64, requested: u64) -> Result<(File, PathBuf, Option<u64>)> {
        let inner = self.inner.lock();
        let open_file = inner
            .files
            .get(&fd)
            .ok_or_else(|| FsError::Unknown(format!("Unknown file descriptor {}", fd)))?;

        let file = open_file
            .file
            .try_clone()
            .map_err(|e| FsError::from_io(e, &open_file.path))?;

        let normalized = if inner.pos.get(&fd) == Some(&requested) {
            None
        } else {
            Some(requested)
        };

        Ok((file, open_file.path.clone(), normalized))
    }

    /// Bring the cache up to date after an I/O attempt; runs on success
    /// and on failure, before the result reaches the caller
    fn finalize(&self, fd: u64, normalized: Option<u64>, result: &std::io::Result<usize>) {
        let mut inner = self.inner.lock();
        match result {
            Ok(transferred) => {
                // Positional I/O leaves the kernel cursor alone, so an
                // explicit offset leaves the cache alone too
                if normalized.is_none() {
                    if let Some(pos) = inner.pos.get_mut(&fd) {
                        *pos += *transferred as u64;
                    }
                }
            }
            Err(_) => {
                // Position is unknown now; force explicit offsets until
                // the next open
                inner.pos.remove(&fd);
            }
        }
    }
}

impl DiskFileSystemProvider {
    /// Open a descriptor for `resource`
    ///
    /// `create` doubles as write intent. Writable opens truncate; on
    /// Windows the file is truncated first and reopened without the
    /// truncate flag so the hidden attribute and alternate data streams
    /// survive.
    pub fn open(&self, resource: &FileResource, opts: &FileOpenOptions) -> Result<u64> {
        let path = resource.as_path();
        let writable = opts.create;

        if writable && opts.unlock {
            ensure_write_unlocked(path);
        }

        let file = if writable {
            open_for_write(path).map_err(|e| FsError::from_io_write(e, path))?
        } else {
            File::open(path).map_err(|e| FsError::from_io(e, path))?
        };

        Ok(self.registry.insert(file, resource, writable))
    }

    /// Close a descriptor, flushing writable ones to disk first
    pub fn close(&self, fd: u64) -> Result<()> {
        let (open_file, was_writable) = {
            let mut inner = self.registry.inner.lock();
            inner.pos.remove(&fd);
            let was_writable = inner.writable.remove(&fd).is_some();
            let open_file = inner
                .files
                .remove(&fd)
                .ok_or_else(|| FsError::Unknown(format!("Unknown file descriptor {}", fd)))?;
            (open_file, was_writable)
        };

        if was_writable && self.can_flush.load(Ordering::Acquire) {
            if let Err(e) = open_file.file.sync_data() {
                self.can_flush.store(false, Ordering::Release);
                tracing::error!(
                    "Failed to flush {:?} on close; disabling flush-on-close: {}",
                    open_file.path,
                    e
                );
            }
        }

        drop(open_file);
        Ok(())
    }

    /// Read up to `buf.len()` bytes at `pos`
    pub fn read(&self, fd: u64, pos: u64, buf: &mut [u8]) -> Result<usize> {
        let (file, path, normalized) = self.registry.prepare(fd, pos)?;

        let result = match normalized {
            None => (&file).read(buf),
            Some(offset) => read_at(&file, buf, offset),
        };
        self.registry.finalize(fd, normalized, &result);

        result.map_err(|e| FsError::from_io(e, &path))
    }

    /// Write `data` at `pos`
    ///
    /// Retried on failure: the open already truncated the file, so giving
    /// up on a transient error (antivirus, indexer) would leave it empty.
    pub fn write(&self, fd: u64, pos: u64, data: &[u8]) -> Result<usize> {
        let mut attempt = 0;
        loop {
            match self.do_write(fd, pos, data) {
                Ok(written) => return Ok(written),
                Err(e) => {
                    attempt += 1;
                    if attempt >= MAX_WRITE_ATTEMPTS {
                        return Err(e);
                    }
                    tracing::warn!(
                        "Retrying failed write (attempt {}/{}): {}",
                        attempt,
                        MAX_WRITE_ATTEMPTS,
                        e
                    );
                    thread::sleep(WRITE_RETRY_DELAY);
                }
            }
        }
    }

    fn do_write(&self, fd: u64, pos: u64, data: &[u8]) -> Result<usize> {
        let (file, path, normalized) = self.registry.prepare(fd, pos)?;

        let result = match normalized {
            None => (&file).write(data),
            Some(offset) => write_at(&file, data, offset),
        };
        self.registry.finalize(fd, normalized, &result);

        result.map_err(|e| FsError::from_io_write(e, &path))
    }
}

/// Best-effort: set the owner-write bit before opening for write
fn ensure_write_unlocked(path: &Path) {
    match std::fs::metadata(path) {
        Ok(meta) => {
            let mut permissions = meta.permissions();
            if !is_writable(&permissions) {
                set_writable(&mut permissions);
                if let Err(e) = std::fs::set_permissions(path, permissions) {
                    tracing::trace!("Ignoring failed unlock of {:?}: {}", path, e);
                }
            }
        }
        Err(e) => {
            tracing::trace!("Ignoring failed unlock probe of {:?}: {}", path, e);
        }
    }
}

#[cfg(unix)]
fn is_writable(permissions: &std::fs::Permissions) -> bool {
    use std::os::unix::fs::PermissionsExt;
    permissions.mode() & 0o200 != 0
}

#[cfg(unix)]
fn set_writable(permissions: &mut std::fs::Permissions) {
    use std::os::unix::fs::PermissionsExt;
    permissions.set_mode(permissions.mode() | 0o200);
}

#[cfg(not(unix))]
fn is_writable(permissions: &std::fs::Permissions) -> bool {
    !permissions.readonly()
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn set_writable(permissions: &mut std::fs::Permissions) {
    permissions.set_readonly(false);
}

#[cfg(windows)]
fn open_for_write(path: &Path) -> std::io::Result<File> {
    // Opening with the truncate flag on Windows destroys the hidden
    // attribute and alternate data streams. Truncate in place first, then
    // open read+write without it.
    match truncate_existing(path) {
        Ok(()) => return OpenOptions::new().read(true).write(true).open(path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::trace!("Pre-truncate of {:?} failed, using truncating open: {}", path, e);
        }
    }

    OpenOptions::new().write(true).create(true).truncate(true).open(path)
}

#[cfg(windows)]
fn truncate_existing(path: &Path) -> std::io::Result<()> {
    OpenOptions::new().write(true).open(path)?.set_len(0)
}

#[cfg(not(windows))]
fn open_for_write(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).create(true).truncate(true).open(path)
}

#[cfg(unix)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.read_at(buf, offset)
}

#[cfg(unix)]
fn write_at(file: &File, data: &[u8], offset: u64) -> std::io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.write_at(data, offset)
}

#[cfg(windows)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_read(buf, offset)
}

#[cfg(windows)]
fn write_at(file: &File, data: &[u8], offset: u64) -> std::io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_write(data, offset)
}
