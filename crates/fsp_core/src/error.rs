//! Portable error taxonomy and OS-error translation

use std::io;
use std::path::Path;
use thiserror::Error;

/// The portable error taxonomy
///
/// Every public provider operation either succeeds or fails with one of
/// these, wrapped with a human-readable message. Native errors are
/// translated through [`FsError::from_io`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("File is a directory: {0}")]
    FileIsADirectory(String),

    #[error("File is not a directory: {0}")]
    FileNotADirectory(String),

    #[error("File already exists: {0}")]
    FileExists(String),

    #[error("No permissions: {0}")]
    NoPermissions(String),

    #[error("File is write-locked: {0}")]
    FileWriteLocked(String),

    #[error("{0}")]
    Unknown(String),
}

pub type Result<T> = std::result::Result<T, FsError>;

impl FsError {
    /// Translate a native error for `path` into the portable taxonomy
    ///
    /// Translation is idempotent: an [`FsError`] previously tunneled
    /// through [`FsError::into_io`] passes through unchanged.
    pub fn from_io(err: io::Error, path: &Path) -> FsError {
        if let Some(wrapped) = err.get_ref().and_then(|e| e.downcast_ref::<FsError>()) {
            return wrapped.clone();
        }

        let display = path.to_string_lossy();
        match err.kind() {
            io::ErrorKind::NotFound => FsError::FileNotFound(display.into_owned()),
            io::ErrorKind::IsADirectory => FsError::FileIsADirectory(display.into_owned()),
            io::ErrorKind::NotADirectory => FsError::FileNotADirectory(display.into_owned()),
            io::ErrorKind::AlreadyExists => FsError::FileExists(display.into_owned()),
            io::ErrorKind::PermissionDenied => FsError::NoPermissions(display.into_owned()),
            _ => match err.raw_os_error() {
                // EPERM surfaces as Uncategorized on some platforms
                Some(1) if cfg!(unix) => FsError::NoPermissions(display.into_owned()),
                _ => FsError::Unknown(format!("{}: {}", err, display)),
            },
        }
    }

    /// Translate a native write error, upgrading `NoPermissions` to
    /// `FileWriteLocked` when the target lacks the owner-write bit
    ///
    /// The probe is best-effort: if the re-stat fails the original error
    /// stands.
    pub fn from_io_write(err: io::Error, path: &Path) -> FsError {
        let translated = Self::from_io(err, path);

        if matches!(translated, FsError::NoPermissions(_)) && is_write_locked(path) {
            return FsError::FileWriteLocked(path.to_string_lossy().into_owned());
        }

        translated
    }

    /// Tunnel this error through an `io::Error` without losing identity
    pub fn into_io(self) -> io::Error {
        io::Error::other(self)
    }
}

/// Probe whether `path` is missing the owner-write bit
#[cfg(unix)]
fn is_write_locked(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    match std::fs::metadata(path) {
        Ok(meta) => meta.permissions().mode() & 0o200 == 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_write_locked(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) => meta.permissions().readonly(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_kind_mapping() {
        let path = Path::new("/tmp/x");
        let cases = [
            (io::ErrorKind::NotFound, "FileNotFound"),
            (io::ErrorKind::AlreadyExists, "FileExists"),
            (io::ErrorKind::PermissionDenied, "NoPermissions"),
        ];
        for (kind, expected) in cases {
            let err = FsError::from_io(io::Error::from(kind), path);
            let name = match err {
                FsError::FileNotFound(_) => "FileNotFound",
                FsError::FileExists(_) => "FileExists",
                FsError::NoPermissions(_) => "NoPermissions",
                _ => "other",
            };
            assert_eq!(name, expected, "mapping of {:?}", kind);
        }
    }

    #[test]
    fn test_unmapped_becomes_unknown() {
        let err = FsError::from_io(io::Error::from(io::ErrorKind::TimedOut), Path::new("/tmp/x"));
        assert!(matches!(err, FsError::Unknown(_)));
    }

    #[test]
    fn test_translation_is_idempotent() {
        let original = FsError::FileNotFound("/tmp/gone".to_string());
        let tunneled = original.clone().into_io();
        let retranslated = FsError::from_io(tunneled, Path::new("/elsewhere"));
        assert_eq!(retranslated, original);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_locked_upgrade() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("locked.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"data").unwrap();
        drop(f);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o444)).unwrap();

        let err = FsError::from_io_write(io::Error::from(io::ErrorKind::PermissionDenied), &path);
        assert!(matches!(err, FsError::FileWriteLocked(_)));

        // restore so the tempdir can clean up
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_no_upgrade_when_writable() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("open.txt");
        std::fs::write(&path, b"data").unwrap();

        let err = FsError::from_io_write(io::Error::from(io::ErrorKind::PermissionDenied), &path);
        assert!(matches!(err, FsError::NoPermissions(_)));
    }

    #[test]
    fn test_probe_failure_keeps_original() {
        let err = FsError::from_io_write(
            io::Error::from(io::ErrorKind::PermissionDenied),
            Path::new("/definitely/not/here"),
        );
        assert!(matches!(err, FsError::NoPermissions(_)));
    }
}
