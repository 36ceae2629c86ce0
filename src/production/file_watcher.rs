//! `notify`-based file watcher implementation
//!
//! Each file is watched through its parent directory so that editors which
//! save by writing a temp file and renaming it over the original keep
//! triggering callbacks.

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::traits::{FileUpdateListener, FileWatcher, FileWatcherError};

#[derive(Default)]
struct WatchRegistry {
    files: HashMap<PathBuf, Vec<Arc<dyn FileUpdateListener>>>,
    /// Watched directory -> number of registered files inside it
    directories: HashMap<PathBuf, usize>,
}

impl WatchRegistry {
    fn listeners_for(&self, path: &Path) -> Vec<Arc<dyn FileUpdateListener>> {
        self.files.get(path).cloned().unwrap_or_default()
    }
}

pub struct NotifyFileWatcher {
    debouncer: Mutex<Debouncer<RecommendedWatcher>>,
    registry: Arc<Mutex<WatchRegistry>>,
}

/// Registry key for a file: canonical parent directory joined with the file
/// name. Only the directory is resolved, so the key stays the same after the
/// file itself is deleted or replaced.
fn normalize(path: &Path) -> PathBuf {
    let Some(name) = path.file_name() else {
        return path.to_path_buf();
    };
    match std::fs::canonicalize(parent_dir(path)) {
        Ok(dir) => dir.join(name),
        Err(_) => path.to_path_buf(),
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

impl NotifyFileWatcher {
    pub fn new(debounce: Duration) -> Result<Self, FileWatcherError> {
        let (tx, rx) = std::sync::mpsc::channel::<DebounceEventResult>();
        let registry = Arc::new(Mutex::new(WatchRegistry::default()));
        let registry_clone = Arc::clone(&registry);

        // Spawn event dispatch thread
        std::thread::spawn(move || {
            for result in rx {
                match result {
                    Ok(events) => {
                        // One callback per file per debounced batch
                        let changed: HashSet<PathBuf> =
                            events.iter().map(|event| normalize(&event.path)).collect();

                        for path in changed {
                            let listeners = registry_clone
                                .lock()
                                .unwrap_or_else(|e| e.into_inner())
                                .listeners_for(&path);
                            if listeners.is_empty() {
                                continue;
                            }
                            tracing::debug!(path = %path.display(), listeners = listeners.len(), "Watched file changed");
                            for listener in listeners {
                                listener.file_updated();
                            }
                        }
                    }
                    Err(error) => {
                        tracing::error!("Watch error: {:?}", error);
                    }
                }
            }
        });

        let debouncer = new_debouncer(debounce, move |res: DebounceEventResult| {
            let _ = tx.send(res);
        })
        .map_err(|e| FileWatcherError::WatchError(e.to_string()))?;

        Ok(Self {
            debouncer: Mutex::new(debouncer),
            registry,
        })
    }
}

impl FileWatcher for NotifyFileWatcher {
    fn watch(&self, path: PathBuf, listener: Arc<dyn FileUpdateListener>) -> Result<(), FileWatcherError> {
        if !path.exists() {
            return Err(FileWatcherError::PathNotFound(path));
        }
        let path = normalize(&path);
        let dir = parent_dir(&path);

        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        if !registry.directories.contains_key(&dir) {
            let mut debouncer = self.debouncer.lock().unwrap_or_else(|e| e.into_inner());
            debouncer
                .watcher()
                .watch(&dir, RecursiveMode::NonRecursive)
                .map_err(|e| FileWatcherError::WatchError(e.to_string()))?;
        }
        *registry.directories.entry(dir).or_insert(0) += 1;
        registry.files.entry(path.clone()).or_default().push(listener);

        tracing::info!("Watching path: {:?}", path);
        Ok(())
    }

    fn unwatch(&self, path: &Path, listener: &Arc<dyn FileUpdateListener>) -> Result<(), FileWatcherError> {
        let path = normalize(path);
        let dir = parent_dir(&path);

        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        let Some(listeners) = registry.files.get_mut(&path) else {
            return Ok(());
        };
        let before = listeners.len();
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
        if listeners.len() == before {
            return Ok(());
        }
        if listeners.is_empty() {
            registry.files.remove(&path);
        }

        let remaining = match registry.directories.get_mut(&dir) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => return Ok(()),
        };
        if remaining == 0 {
            registry.directories.remove(&dir);
            let mut debouncer = self.debouncer.lock().unwrap_or_else(|e| e.into_inner());
            debouncer
                .watcher()
                .unwatch(&dir)
                .map_err(|e| FileWatcherError::WatchError(e.to_string()))?;
        }

        tracing::info!("Unwatched path: {:?}", path);
        Ok(())
    }

    fn watched_paths(&self) -> Vec<PathBuf> {
        self.registry
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .files
            .keys()
            .cloned()
            .collect()
    }
}
