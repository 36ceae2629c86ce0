//! Production implementations of traits

mod file_watcher;
mod task_executor;

pub use file_watcher::NotifyFileWatcher;
pub use task_executor::{InteractiveQueue, TokioTaskExecutor};
