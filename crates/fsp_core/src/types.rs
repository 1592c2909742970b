//! Portable file types, stat records and change events

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

bitflags! {
    /// Classification of a directory entry
    ///
    /// Flags combine: a symlink to a directory is `DIRECTORY | SYMBOLIC_LINK`.
    /// The empty set means the entry could not be classified (sockets,
    /// devices, dangling symlink targets).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FileType: u32 {
        const FILE = 1 << 0;
        const DIRECTORY = 1 << 1;
        const SYMBOLIC_LINK = 1 << 6;
    }
}

impl FileType {
    /// The unclassifiable entry: no flags set
    pub const UNKNOWN: FileType = FileType::empty();
}

/// Portable stat record
///
/// `ctime` is the birth time (creation), not the POSIX change-time; where
/// the platform cannot report a birth time it falls back to `mtime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub file_type: FileType,
    /// Creation time in milliseconds since the Unix epoch
    pub ctime: u64,
    /// Modification time in milliseconds since the Unix epoch
    pub mtime: u64,
    pub size: u64,
}

/// What happened to a watched path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChangeKind {
    Created,
    Updated,
    Deleted,
}

/// A single change reported by a watcher backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub kind: FileChangeKind,
    pub path: PathBuf,
}

/// Options for `open`
///
/// `create` doubles as the write-intent flag: descriptors opened with
/// `create` are tracked as writable and flushed on close.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileOpenOptions {
    pub create: bool,
    pub unlock: bool,
}

/// Options for `write_file`
#[derive(Debug, Clone, Copy, Default)]
pub struct FileWriteOptions {
    pub create: bool,
    pub overwrite: bool,
    pub unlock: bool,
}

/// Options for `delete`
///
/// `use_trash` is accepted for interface compatibility but the disk
/// provider always deletes permanently; trash integration lives upstream.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileDeleteOptions {
    pub recursive: bool,
    pub use_trash: bool,
}

/// Options for `rename` and `copy`
#[derive(Debug, Clone, Copy, Default)]
pub struct FileOverwriteOptions {
    pub overwrite: bool,
}

/// Options for `watch`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchOptions {
    pub recursive: bool,
    pub excludes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_combines() {
        let link_to_dir = FileType::DIRECTORY | FileType::SYMBOLIC_LINK;
        assert!(link_to_dir.contains(FileType::SYMBOLIC_LINK));
        assert!(link_to_dir.contains(FileType::DIRECTORY));
        assert!(!link_to_dir.contains(FileType::FILE));
    }

    #[test]
    fn test_unknown_is_empty() {
        assert!(FileType::UNKNOWN.is_empty());
        // A dangling symlink carries only the link flag
        let dangling = FileType::UNKNOWN | FileType::SYMBOLIC_LINK;
        assert_eq!(dangling, FileType::SYMBOLIC_LINK);
    }
}
