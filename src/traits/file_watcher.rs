//! File watching capability for monitoring a document's backing file

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileWatcherError {
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
    #[error("Watch error: {0}")]
    WatchError(String),
}

/// Callback fired when a watched file changes on disk.
///
/// May be invoked on any thread, possibly more than once per modification.
pub trait FileUpdateListener: Send + Sync {
    fn file_updated(&self);
}

/// Trait for file system watching
///
/// Production: `notify` with a debouncer
/// Testing: Manual event emission
#[cfg_attr(test, mockall::automock)]
pub trait FileWatcher: Send + Sync {
    /// Register `listener` for changes to the file at `path`
    fn watch(&self, path: PathBuf, listener: Arc<dyn FileUpdateListener>) -> Result<(), FileWatcherError>;

    /// Remove a registration made by `watch`. Listeners are matched by `Arc` identity.
    fn unwatch(&self, path: &Path, listener: &Arc<dyn FileUpdateListener>) -> Result<(), FileWatcherError>;

    /// Get the list of currently watched paths
    fn watched_paths(&self) -> Vec<PathBuf>;
}
