//! Metadata: stat and readdir

use crate::provider::DiskFileSystemProvider;
use fsp_core::{FileResource, FileStat, FileType, FsError, Result};
use std::fs::Metadata;
use std::time::{SystemTime, UNIX_EPOCH};

impl DiskFileSystemProvider {
    /// Stat a resource, resolving symlinks
    ///
    /// The entry itself is inspected first so links are observed as links;
    /// a link whose target cannot be resolved is dangling and classifies
    /// as `SYMBOLIC_LINK` with no target type, never as file or directory.
    pub fn stat(&self, resource: &FileResource) -> Result<FileStat> {
        let path = resource.as_path();

        let link_meta = std::fs::symlink_metadata(path).map_err(|e| FsError::from_io(e, path))?;
        let is_symlink = link_meta.file_type().is_symlink();

        let (meta, dangling) = if is_symlink {
            match std::fs::metadata(path) {
                Ok(target_meta) => (target_meta, false),
                Err(_) => (link_meta, true),
            }
        } else {
            (link_meta, false)
        };

        let mut file_type = if dangling {
            FileType::UNKNOWN
        } else if meta.is_file() {
            FileType::FILE
        } else if meta.is_dir() {
            FileType::DIRECTORY
        } else {
            FileType::UNKNOWN
        };
        if is_symlink {
            file_type |= FileType::SYMBOLIC_LINK;
        }

        Ok(FileStat {
            file_type,
            ctime: birth_time_millis(&meta),
            mtime: modified_millis(&meta),
            size: meta.len(),
        })
    }

    /// List a directory as `(name, type)` pairs
    ///
    /// Symlink entries are re-stat'ed through the joined path so the
    /// caller can tell links to directories from links to files. A single
    /// unreadable entry is logged and dropped; only failure to open the
    /// directory itself propagates.
    pub fn readdir(&self, resource: &FileResource) -> Result<Vec<(String, FileType)>> {
        let path = resource.as_path();
        let entries = std::fs::read_dir(path).map_err(|e| FsError::from_io(e, path))?;

        let mut result = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry in {:?}: {}", path, e);
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy().to_string();
            let entry_type = match entry.file_type() {
                Ok(ft) if ft.is_symlink() => {
                    match self.stat(&resource.join(entry.file_name())) {
                        Ok(stat) => stat.file_type,
                        Err(e) => {
                            tracing::warn!("Skipping unresolvable entry {:?}: {}", name, e);
                            continue;
                        }
                    }
                }
                Ok(ft) if ft.is_file() => FileType::FILE,
                Ok(ft) if ft.is_dir() => FileType::DIRECTORY,
                Ok(_) => FileType::UNKNOWN,
                Err(e) => {
                    tracing::warn!("Skipping untyped entry {:?}: {}", name, e);
                    continue;
                }
            };

            result.push((name, entry_type));
        }

        Ok(result)
    }
}

fn to_millis(time: std::io::Result<SystemTime>) -> Option<u64> {
    time.ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64)
}

/// Birth time (creation), falling back to mtime where the platform has no
/// notion of it
fn birth_time_millis(meta: &Metadata) -> u64 {
    to_millis(meta.created()).unwrap_or_else(|| modified_millis(meta))
}

fn modified_millis(meta: &Metadata) -> u64 {
    to_millis(meta.modified()).unwrap_or(0)
}
