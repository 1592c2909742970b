//! Portable filesystem-provider model
//!
//! This crate contains:
//! - FileResource: `file`-scheme resource handling with path normalization
//! - File types, stat records and change events
//! - Capability bitset advertised by providers
//! - The portable error taxonomy and OS-error translation
//! - Event emitter and disposal primitives
//! - Throttled delayer for coalesced scheduling
//! - Provider configuration

pub mod capabilities;
pub mod config;
pub mod error;
pub mod event;
pub mod resource;
pub mod types;
pub mod util;

pub use capabilities::Capabilities;
pub use config::{LegacyWatcherMode, ProviderConfig, UsePolling, WatcherConfig};
pub use error::{FsError, Result};
pub use event::{Emitter, Subscription};
pub use resource::FileResource;
pub use types::{
    FileChange, FileChangeKind, FileDeleteOptions, FileOpenOptions, FileOverwriteOptions,
    FileStat, FileType, FileWriteOptions, WatchOptions,
};
pub use util::{Disposable, ThrottledDelayer};
