//! Local disk filesystem provider
//!
//! Serves `file`-scheme resources against the host filesystem:
//! - Metadata: stat with symlink resolution, readdir with per-entry recovery
//! - Bulk I/O: whole-file read, atomic truncate-then-write, chunked streams
//! - Descriptor I/O: positional read/write over a descriptor position cache
//! - Mutations: mkdir, recursive delete, case-preserving rename, copy
//! - Watching: recursive requests multiplexed onto one backend watcher
//!
//! Native failures are translated into the portable error taxonomy of
//! `fsp_core`.

mod handles;
mod io;
mod metadata;
mod mutations;
mod provider;
mod stream;

pub use provider::DiskFileSystemProvider;
pub use stream::{CancellationToken, ReadFileStream};
