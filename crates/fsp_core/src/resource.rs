//! FileResource - `file`-scheme resource handling with safe path normalization

use crate::error::FsError;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// A resource identifier restricted to the local `file` scheme
///
/// Features:
/// - Accepts `file://` URI strings as well as plain paths
/// - Lexical normalization (resolves `.` and `..` without touching the disk)
/// - Automatic UNC prefix (\\?\) on Windows for long path support
/// - Lossy UTF-8 display string for messages
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileResource {
    /// Normalized path for file system operations (with UNC prefix on Windows)
    raw: PathBuf,

    /// UTF-8 display string (lossy conversion for messages)
    display: String,
}

impl FileResource {
    /// Create a resource from any path-like type
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let raw = normalize_path(path.as_ref());
        let display = raw.to_string_lossy().to_string();

        Self { raw, display }
    }

    /// Parse a resource string, accepting `file://` URIs and plain paths
    ///
    /// Any scheme other than `file` is rejected: this provider only serves
    /// the local disk.
    pub fn parse(input: &str) -> Result<Self, FsError> {
        if let Some(rest) = input.strip_prefix("file://") {
            return Ok(Self::new(rest));
        }

        if let Some(scheme_end) = input.find("://") {
            let scheme = &input[..scheme_end];
            return Err(FsError::Unknown(format!(
                "Unsupported scheme '{}' in resource '{}'",
                scheme, input
            )));
        }

        Ok(Self::new(input))
    }

    /// Get the normalized path for file system operations
    pub fn as_path(&self) -> &Path {
        &self.raw
    }

    /// Get the normalized path (owned)
    pub fn to_path_buf(&self) -> PathBuf {
        self.raw.clone()
    }

    /// Get the display string for messages
    pub fn display(&self) -> &str {
        &self.display
    }

    /// Get parent resource
    pub fn parent(&self) -> Option<Self> {
        self.raw.parent().map(Self::new)
    }

    /// Get the final path component
    pub fn basename(&self) -> String {
        self.raw
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Join with another path component
    pub fn join<P: AsRef<Path>>(&self, path: P) -> Self {
        Self::new(self.raw.join(path))
    }
}

/// Resolve `.` and `..` lexically, without consulting the disk
///
/// Symlinks are deliberately not resolved: stat and readdir must observe
/// links as links.
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            _ => normalized.push(component),
        }
    }

    add_unc_prefix(normalized)
}

#[cfg(windows)]
fn add_unc_prefix(path: PathBuf) -> PathBuf {
    let path_str = path.to_string_lossy();
    if path.is_absolute() && !path_str.starts_with(r"\\?\") && !path_str.starts_with(r"\\.\") {
        PathBuf::from(format!(r"\\?\{}", path_str))
    } else {
        path
    }
}

#[cfg(not(windows))]
fn add_unc_prefix(path: PathBuf) -> PathBuf {
    path
}

impl AsRef<Path> for FileResource {
    fn as_ref(&self) -> &Path {
        &self.raw
    }
}

impl From<PathBuf> for FileResource {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&Path> for FileResource {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

impl From<&str> for FileResource {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl std::fmt::Display for FileResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display without UNC prefix for readability
        let display = self.display.strip_prefix(r"\\?\").unwrap_or(&self.display);
        write!(f, "{}", display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_path() {
        let res = FileResource::parse("/tmp/data/file.txt").unwrap();
        assert_eq!(res.basename(), "file.txt");
    }

    #[test]
    fn test_file_uri() {
        let res = FileResource::parse("file:///tmp/data/file.txt").unwrap();
        assert!(res.display().contains("file.txt"));
    }

    #[test]
    fn test_foreign_scheme_rejected() {
        let err = FileResource::parse("https://example.com/a").unwrap_err();
        assert!(matches!(err, FsError::Unknown(_)));
    }

    #[test]
    fn test_dot_segments_resolved() {
        let res = FileResource::new("/tmp/a/./b/../c.txt");
        assert_eq!(res.as_path(), Path::new("/tmp/a/c.txt"));
    }

    #[test]
    fn test_parent_and_join() {
        let res = FileResource::new("/tmp/a/b.txt");
        let parent = res.parent().expect("has parent");
        assert_eq!(parent.basename(), "a");
        assert_eq!(parent.join("c.txt").basename(), "c.txt");
    }

    #[test]
    fn test_unicode_path() {
        let res = FileResource::new("/home/ユーザー/画像/写真.jpg");
        assert_eq!(res.basename(), "写真.jpg");
        assert!(res.display().contains("画像"));
    }

    #[cfg(windows)]
    #[test]
    fn test_unc_prefix_added() {
        let res = FileResource::new(r"C:\Users\test\file.txt");
        assert!(res.display().starts_with(r"\\?\"));
    }

    #[cfg(windows)]
    #[test]
    fn test_unc_prefix_not_duplicated() {
        let res = FileResource::new(r"\\?\C:\Users\test\file.txt");
        assert_eq!(res.display().matches(r"\\?\").count(), 1);
    }
}
