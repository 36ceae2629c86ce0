//! Trait definitions for dependency injection
//!
//! All external collaborators are abstracted behind traits to enable testing.

mod change_listener;
mod file_watcher;
mod task_executor;

pub use change_listener::DatabaseChangeListener;
pub use file_watcher::{FileUpdateListener, FileWatcher, FileWatcherError};
#[cfg(test)]
pub use file_watcher::MockFileWatcher;
pub use task_executor::{Job, TaskExecutor};
