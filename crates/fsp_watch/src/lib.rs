//! File watching subsystem
//!
//! Provides:
//! - A uniform watcher-backend interface with three implementations
//!   (polling, legacy per-folder, efficient shared) built on `notify`
//! - The recursive watch multiplexer that serves many watch requests from
//!   one backend
//! - A per-path non-recursive watcher
//!
//! Raw backend events flow through a debounce thread that settles rapid
//! successions before they are mapped to portable change records and
//! filtered against exclude globs.

mod backend;
mod backends;
mod multiplexer;
mod nonrecursive;

pub use backend::{
    select_backend_kind, BackendKind, BackendOptions, ChangeHandler, LogHandler, MessageLevel,
    WatchError, WatchRequest, WatcherBackend, WatcherMessage,
};
pub use backends::{create_backend, EfficientWatcher, LegacyWatcher, PollingWatcher};
pub use multiplexer::WatchMultiplexer;
pub use nonrecursive::NonRecursiveWatcher;
