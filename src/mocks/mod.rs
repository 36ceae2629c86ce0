//! Test doubles for dependency injection
//!
//! Provides in-memory implementations of all external collaborators for isolated testing.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::diff::DatabaseChange;
use crate::traits::{
    DatabaseChangeListener, FileUpdateListener, FileWatcher, FileWatcherError, Job, TaskExecutor,
};

// ============================================================================
// ManualFileWatcher
// ============================================================================

/// Manual file watcher for testing
///
/// Does not actually watch the file system. Tests call `simulate_change`
/// to fire the registered callbacks.
#[derive(Clone, Default)]
pub struct ManualFileWatcher {
    listeners: Arc<Mutex<HashMap<PathBuf, Vec<Arc<dyn FileUpdateListener>>>>>,
}

impl ManualFileWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a path currently has at least one listener
    pub fn is_watching(&self, path: &Path) -> bool {
        self.listener_count(path) > 0
    }

    pub fn listener_count(&self, path: &Path) -> usize {
        self.listeners
            .lock()
            .unwrap()
            .get(path)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Simulate an on-disk modification of `path` (for testing)
    pub fn simulate_change(&self, path: &Path) {
        let listeners = self
            .listeners
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_default();
        for listener in listeners {
            listener.file_updated();
        }
    }
}

impl FileWatcher for ManualFileWatcher {
    fn watch(&self, path: PathBuf, listener: Arc<dyn FileUpdateListener>) -> Result<(), FileWatcherError> {
        self.listeners
            .lock()
            .unwrap()
            .entry(path)
            .or_default()
            .push(listener);
        Ok(())
    }

    fn unwatch(&self, path: &Path, listener: &Arc<dyn FileUpdateListener>) -> Result<(), FileWatcherError> {
        let mut listeners = self.listeners.lock().unwrap();
        if let Some(registered) = listeners.get_mut(path) {
            registered.retain(|l| !Arc::ptr_eq(l, listener));
            if registered.is_empty() {
                listeners.remove(path);
            }
        }
        Ok(())
    }

    fn watched_paths(&self) -> Vec<PathBuf> {
        self.listeners.lock().unwrap().keys().cloned().collect()
    }
}

// ============================================================================
// Executors
// ============================================================================

/// Runs every job on the calling thread before returning
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateExecutor;

impl TaskExecutor for ImmediateExecutor {
    fn execute(&self, job: Job) {
        job()
    }
}

/// Holds jobs until the test runs them
#[derive(Default)]
pub struct QueuedExecutor {
    queue: Mutex<VecDeque<Job>>,
}

impl QueuedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs waiting
    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Run queued jobs, including ones queued while running. Returns how many ran.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.queue.lock().unwrap().pop_front();
            match next {
                Some(job) => {
                    job();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }
}

impl TaskExecutor for QueuedExecutor {
    fn execute(&self, job: Job) {
        self.queue.lock().unwrap().push_back(job);
    }
}

// ============================================================================
// RecordingListener
// ============================================================================

/// Records every change batch it receives
#[derive(Default)]
pub struct RecordingListener {
    batches: Mutex<Vec<Vec<DatabaseChange>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<Vec<DatabaseChange>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }
}

impl DatabaseChangeListener for RecordingListener {
    fn database_changed(&self, changes: &[DatabaseChange]) {
        self.batches.lock().unwrap().push(changes.to_vec());
    }
}

// ============================================================================
// Tests
// ============================================================================
