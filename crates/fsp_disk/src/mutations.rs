//! Mutations: mkdir, delete, rename, copy

use crate::provider::DiskFileSystemProvider;
use fsp_core::{FileDeleteOptions, FileOverwriteOptions, FileResource, FsError, Result};
use std::io;
use std::path::Path;
use uuid::Uuid;

impl DiskFileSystemProvider {
    pub fn mkdir(&self, resource: &FileResource) -> Result<()> {
        let path = resource.as_path();
        std::fs::create_dir(path).map_err(|e| FsError::from_io(e, path))
    }

    /// Delete a resource
    ///
    /// Recursive deletes move the target to a temporary sibling before
    /// unlinking, which tolerates Windows file-in-use errors on the
    /// original path. `use_trash` is delegated upstream; the disk provider
    /// always deletes permanently.
    pub fn delete(&self, resource: &FileResource, opts: &FileDeleteOptions) -> Result<()> {
        let path = resource.as_path();

        if opts.use_trash {
            tracing::trace!("Trash requested for {:?}; deleting permanently", path);
        }

        if opts.recursive {
            remove_via_move(path).map_err(|e| FsError::from_io(e, path))
        } else {
            std::fs::remove_file(path).map_err(|e| FsError::from_io(e, path))
        }
    }

    /// Rename a resource, preserving case-only renames on case-insensitive
    /// filesystems
    pub fn rename(
        &self,
        from: &FileResource,
        to: &FileResource,
        opts: &FileOverwriteOptions,
    ) -> Result<()> {
        if self.validate_target_deleted(from, to, opts.overwrite, false)? {
            return Ok(());
        }

        std::fs::rename(from.as_path(), to.as_path())
            .map_err(|e| rewrite_opaque_error(e, from, to, "move"))
    }

    /// Copy a resource; directories are copied recursively with symlinks
    /// preserved as symlinks
    pub fn copy(
        &self,
        from: &FileResource,
        to: &FileResource,
        opts: &FileOverwriteOptions,
    ) -> Result<()> {
        if self.validate_target_deleted(from, to, opts.overwrite, true)? {
            return Ok(());
        }

        copy_any(from.as_path(), to.as_path())
            .map_err(|e| rewrite_opaque_error(e, from, to, "copy"))
    }

    /// Shared rename/copy preamble
    ///
    /// Returns `true` when the operation is a no-op (identical paths).
    /// Case-only differences count as the same resource on
    /// case-insensitive filesystems: a case-only copy is refused, while a
    /// case-only rename skips the target-exists check so the case change
    /// goes through.
    fn validate_target_deleted(
        &self,
        from: &FileResource,
        to: &FileResource,
        overwrite: bool,
        is_copy: bool,
    ) -> Result<bool> {
        if from.as_path() == to.as_path() {
            return Ok(true);
        }

        let case_sensitive = self.capabilities().is_case_sensitive();
        let same_resource_with_different_case = !case_sensitive && paths_equal_ignore_case(from, to);

        if is_copy && same_resource_with_different_case {
            return Err(FsError::FileExists(format!(
                "Unable to copy '{}' onto a path that differs only in casing",
                from
            )));
        }

        if !same_resource_with_different_case && to.as_path().exists() {
            if !overwrite {
                return Err(FsError::FileExists(to.display().to_string()));
            }
            self.delete(
                to,
                &FileDeleteOptions {
                    recursive: true,
                    use_trash: false,
                },
            )?;
        }

        Ok(false)
    }
}

fn paths_equal_ignore_case(a: &FileResource, b: &FileResource) -> bool {
    a.as_path().to_string_lossy().to_lowercase() == b.as_path().to_string_lossy().to_lowercase()
}

/// Move-then-delete recursive remove
///
/// The target is renamed to a uuid-suffixed sibling first so the original
/// path is freed immediately, then unlinked in place. Falls back to
/// deleting in place when the rename is refused.
fn remove_via_move(path: &Path) -> io::Result<()> {
    let staging = match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => parent.join(format!(
            ".{}.{}.tmp",
            name.to_string_lossy(),
            Uuid::new_v4().simple()
        )),
        _ => return remove_in_place(path),
    };

    match std::fs::rename(path, &staging) {
        Ok(()) => remove_in_place(&staging),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => {
            tracing::trace!("Staged delete of {:?} failed, removing in place: {}", path, e);
            remove_in_place(path)
        }
    }
}

fn remove_in_place(path: &Path) -> io::Result<()> {
    let meta = std::fs::symlink_metadata(path)?;
    if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}

fn copy_any(source: &Path, target: &Path) -> io::Result<()> {
    let file_type = std::fs::symlink_metadata(source)?.file_type();

    if file_type.is_symlink() {
        copy_symlink(source, target)
    } else if file_type.is_dir() {
        copy_dir_recursive(source, target)
    } else {
        std::fs::copy(source, target).map(|_| ())
    }
}

fn copy_dir_recursive(source: &Path, target: &Path) -> io::Result<()> {
    std::fs::create_dir_all(target)?;

    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        copy_any(&entry.path(), &target.join(entry.file_name()))?;
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(source: &Path, target: &Path) -> io::Result<()> {
    let link_target = std::fs::read_link(source)?;
    std::os::unix::fs::symlink(link_target, target)
}

#[cfg(windows)]
fn copy_symlink(source: &Path, target: &Path) -> io::Result<()> {
    let link_target = std::fs::read_link(source)?;
    if source.metadata().map(|m| m.is_dir()).unwrap_or(false) {
        std::os::windows::fs::symlink_dir(link_target, target)
    } else {
        std::os::windows::fs::symlink_file(link_target, target)
    }
}

/// Rewrite the opaque rename/copy failures (symlink cycles, locked
/// targets, over-long names) into a message naming both ends
fn rewrite_opaque_error(err: io::Error, from: &FileResource, to: &FileResource, verb: &str) -> FsError {
    if let Some(code) = err.raw_os_error() {
        if is_opaque_move_code(code) {
            let target_parent = to.parent().map(|p| p.basename()).unwrap_or_default();
            return FsError::Unknown(format!(
                "Unable to {} '{}' into '{}' ({})",
                verb,
                from.basename(),
                target_parent,
                err
            ));
        }
    }

    FsError::from_io(err, to.as_path())
}

#[cfg(unix)]
fn is_opaque_move_code(code: i32) -> bool {
    // EBUSY, EINVAL, ENAMETOOLONG
    #[cfg(target_os = "macos")]
    const NAME_TOO_LONG: i32 = 63;
    #[cfg(not(target_os = "macos"))]
    const NAME_TOO_LONG: i32 = 36;

    matches!(code, 16 | 22) || code == NAME_TOO_LONG
}

#[cfg(windows)]
fn is_opaque_move_code(code: i32) -> bool {
    // ERROR_INVALID_PARAMETER, ERROR_BUSY, ERROR_FILENAME_EXCED_RANGE
    matches!(code, 87 | 170 | 206)
}
