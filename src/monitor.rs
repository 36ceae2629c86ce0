//! Database change monitor
//!
//! Watches a document's backing file, runs a [`ChangeScanner`] in the
//! background whenever the file changes, and fans non-empty change batches
//! out to registered listeners.
//!
//! Detection and acknowledgment are separate: every watch event triggers a
//! scan, but only an explicit checkpoint (`mark_as_saved`,
//! `mark_external_changes_as_resolved`) moves the reference snapshot forward.
//! Nothing here returns an error to the caller; failures are logged and show
//! up only as missing notifications.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock, Weak};

use crate::config::MonitorConfig;
use crate::diff::{DatabaseChange, DiffEngine, RecordDiffEngine};
use crate::document::MonitoredDocument;
use crate::format::{DocumentFormat, JsonDocumentFormat};
use crate::scanner::{ChangeScanner, ScanError, SharedSnapshot};
use crate::snapshot::ReferenceSnapshot;
use crate::task::BackgroundTask;
use crate::traits::{DatabaseChangeListener, FileUpdateListener, FileWatcher, TaskExecutor};

/// Lifecycle of a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// No path, or monitoring could not be set up
    Unmonitored,
    /// Watch registered and reference snapshot held
    Active,
    /// Torn down; terminal
    Unregistered,
}

/// Configures and starts a [`DatabaseChangeMonitor`]
pub struct MonitorBuilder {
    document: MonitoredDocument,
    watcher: Arc<dyn FileWatcher>,
    executor: Arc<dyn TaskExecutor>,
    config: MonitorConfig,
    format: Arc<dyn DocumentFormat>,
    diff: Arc<dyn DiffEngine>,
}

impl MonitorBuilder {
    pub fn config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn format(mut self, format: Arc<dyn DocumentFormat>) -> Self {
        self.format = format;
        self
    }

    pub fn diff_engine(mut self, diff: Arc<dyn DiffEngine>) -> Self {
        self.diff = diff;
        self
    }

    pub fn start(self) -> DatabaseChangeMonitor {
        let inner = Arc::new(MonitorInner {
            document: self.document,
            watcher: self.watcher,
            executor: self.executor,
            config: self.config,
            format: self.format,
            diff: self.diff,
            listeners: Mutex::new(Vec::new()),
            state: Mutex::new(MonitorState::Unmonitored),
            reference: Arc::new(RwLock::new(None)),
            registration: Mutex::new(None),
        });
        inner.activate();
        DatabaseChangeMonitor { inner }
    }
}

/// Watches one document for external modifications.
///
/// Dropping the monitor unregisters its watch and deletes its snapshot.
pub struct DatabaseChangeMonitor {
    inner: Arc<MonitorInner>,
}

impl DatabaseChangeMonitor {
    /// Start monitoring with the default JSON format and record diff
    pub fn start(
        document: MonitoredDocument,
        watcher: Arc<dyn FileWatcher>,
        executor: Arc<dyn TaskExecutor>,
    ) -> Self {
        Self::builder(document, watcher, executor).start()
    }

    pub fn builder(
        document: MonitoredDocument,
        watcher: Arc<dyn FileWatcher>,
        executor: Arc<dyn TaskExecutor>,
    ) -> MonitorBuilder {
        MonitorBuilder {
            document,
            watcher,
            executor,
            config: MonitorConfig::default(),
            format: Arc::new(JsonDocumentFormat),
            diff: Arc::new(RecordDiffEngine),
        }
    }

    /// Listeners are notified in registration order; duplicates are kept
    pub fn add_listener(&self, listener: Arc<dyn DatabaseChangeListener>) {
        self.inner.lock_listeners().push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock_listeners().len()
    }

    pub fn state(&self) -> MonitorState {
        self.inner.state()
    }

    pub fn is_active(&self) -> bool {
        self.state() == MonitorState::Active
    }

    pub fn document(&self) -> &MonitoredDocument {
        &self.inner.document
    }

    /// Stop watching. Safe to call repeatedly.
    ///
    /// Listeners stay registered; a scan already in flight is dropped when it completes.
    pub fn unregister(&self) {
        self.inner.unregister();
    }

    /// Accept the file's current content as the baseline after the
    /// application wrote it
    pub fn mark_as_saved(&self) {
        self.inner.checkpoint();
    }

    /// Accept the file's current content as the baseline after the user
    /// dealt with an external change
    pub fn mark_external_changes_as_resolved(&self) {
        self.mark_as_saved();
    }

    /// Run a scan on the calling thread, bypassing the executor and listeners
    pub fn scan_now(&self) -> Result<Vec<DatabaseChange>, ScanError> {
        self.inner.scanner().scan_for_changes()
    }
}

impl Drop for DatabaseChangeMonitor {
    fn drop(&mut self) {
        self.inner.unregister();
    }
}

struct MonitorInner {
    document: MonitoredDocument,
    watcher: Arc<dyn FileWatcher>,
    executor: Arc<dyn TaskExecutor>,
    config: MonitorConfig,
    format: Arc<dyn DocumentFormat>,
    diff: Arc<dyn DiffEngine>,
    listeners: Mutex<Vec<Arc<dyn DatabaseChangeListener>>>,
    state: Mutex<MonitorState>,
    reference: SharedSnapshot,
    /// The callback handed to the watcher, kept for unregistration
    registration: Mutex<Option<Arc<dyn FileUpdateListener>>>,
}

/// Watch callback. Holds the monitor weakly so the watcher never keeps it alive.
struct WatchRegistration {
    monitor: Weak<MonitorInner>,
}

impl FileUpdateListener for WatchRegistration {
    fn file_updated(&self) {
        if let Some(monitor) = self.monitor.upgrade() {
            monitor.on_file_changed();
        }
    }
}

impl MonitorInner {
    fn state(&self) -> MonitorState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_listeners(&self) -> std::sync::MutexGuard<'_, Vec<Arc<dyn DatabaseChangeListener>>> {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: MonitorState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    fn set_reference(&self, snapshot: Option<ReferenceSnapshot>) {
        *self.reference.write().unwrap_or_else(|e| e.into_inner()) = snapshot;
    }

    fn activate(self: &Arc<Self>) {
        let Some(path) = self.document.path().map(Path::to_path_buf) else {
            tracing::debug!("Document has no backing file, monitoring is inert");
            return;
        };

        let snapshot = match ReferenceSnapshot::capture(&path, &self.config.snapshot) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Error while trying to monitor document");
                return;
            }
        };
        self.set_reference(Some(snapshot));

        let registration: Arc<dyn FileUpdateListener> = Arc::new(WatchRegistration {
            monitor: Arc::downgrade(self),
        });
        // Active before registering: the watcher may call back before `watch` returns
        self.set_state(MonitorState::Active);
        if let Err(e) = self.watcher.watch(path.clone(), Arc::clone(&registration)) {
            tracing::error!(path = %path.display(), error = %e, "Could not watch document");
            self.set_state(MonitorState::Unmonitored);
            self.set_reference(None);
            return;
        }

        *self.registration.lock().unwrap_or_else(|e| e.into_inner()) = Some(registration);
        tracing::info!(path = %path.display(), "Monitoring document for external changes");
    }

    fn scanner(&self) -> ChangeScanner {
        ChangeScanner::new(
            self.document.clone(),
            Arc::clone(&self.format),
            Arc::clone(&self.diff),
        )
        .with_reference(Arc::clone(&self.reference))
    }

    fn on_file_changed(self: &Arc<Self>) {
        if self.state() != MonitorState::Active {
            return;
        }
        let path = self.path_for_logging();
        tracing::debug!(path = %path.display(), "File changed on disk, scheduling scan");

        let scanner = self.scanner();
        let monitor = Arc::downgrade(self);
        BackgroundTask::wrap(move || scanner.scan_for_changes())
            .named("change scan")
            .on_success(move |changes| {
                if let Some(monitor) = monitor.upgrade() {
                    monitor.notify(&changes);
                }
            })
            .on_failure(move |e: ScanError| {
                tracing::warn!(path = %path.display(), error = %e, "Scan for external changes failed");
            })
            .execute_with(Arc::clone(&self.executor));
    }

    fn notify(&self, changes: &[DatabaseChange]) {
        if changes.is_empty() {
            return;
        }
        if self.state() != MonitorState::Active {
            tracing::debug!(changes = changes.len(), "Dropping scan result for unregistered monitor");
            return;
        }
        // Listeners may call back into the monitor, so never hold the lock while notifying
        let listeners: Vec<_> = self.lock_listeners().clone();
        tracing::info!(
            changes = changes.len(),
            listeners = listeners.len(),
            "External changes detected"
        );
        for listener in listeners {
            listener.database_changed(changes);
        }
    }

    fn checkpoint(&self) {
        let Some(path) = self.document.path() else {
            return;
        };
        let mut guard = self.reference.write().unwrap_or_else(|e| e.into_inner());
        let Some(snapshot) = guard.as_mut() else {
            tracing::debug!(path = %path.display(), "No reference snapshot to checkpoint");
            return;
        };
        match snapshot.refresh(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "Reference snapshot advanced"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Checkpoint failed, snapshot is stale"),
        }
    }

    fn unregister(&self) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if *state != MonitorState::Active {
                return;
            }
            *state = MonitorState::Unregistered;
        }

        let registration = self
            .registration
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let (Some(path), Some(registration)) = (self.document.path(), registration) {
            if let Err(e) = self.watcher.unwatch(path, &registration) {
                tracing::warn!(path = %path.display(), error = %e, "Could not remove watch");
            }
            tracing::info!(path = %path.display(), "Stopped monitoring document");
        }
        self.set_reference(None);
    }

    fn path_for_logging(&self) -> PathBuf {
        self.document.path().map(Path::to_path_buf).unwrap_or_default()
    }
}
