//! Change scanner: compares the in-memory document against its file on disk

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use thiserror::Error;

use crate::diff::{DatabaseChange, DiffEngine};
use crate::document::MonitoredDocument;
use crate::format::{DocumentFormat, FormatError};
use crate::snapshot::ReferenceSnapshot;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Document has no backing file")]
    Untracked,
    #[error("Could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: FormatError,
    },
}

/// Shared slot holding a monitor's reference snapshot, if any
pub type SharedSnapshot = Arc<RwLock<Option<ReferenceSnapshot>>>;

/// One-shot, read-only comparison of a document with its backing file.
///
/// Meant to run off the interactive thread: it does file I/O and a full diff.
pub struct ChangeScanner {
    document: MonitoredDocument,
    format: Arc<dyn DocumentFormat>,
    diff: Arc<dyn DiffEngine>,
    reference: Option<SharedSnapshot>,
}

impl ChangeScanner {
    pub fn new(
        document: MonitoredDocument,
        format: Arc<dyn DocumentFormat>,
        diff: Arc<dyn DiffEngine>,
    ) -> Self {
        Self {
            document,
            format,
            diff,
            reference: None,
        }
    }

    /// Short-circuit to "no changes" while the file still matches the reference snapshot
    pub fn with_reference(mut self, reference: SharedSnapshot) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Changes that turn the in-memory state into what is on disk now.
    ///
    /// Order is exactly what the diff engine produced.
    pub fn scan_for_changes(&self) -> Result<Vec<DatabaseChange>, ScanError> {
        let path = self.document.path().ok_or(ScanError::Untracked)?;

        let on_disk = std::fs::read(path).map_err(|source| ScanError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        if self.unchanged_since_checkpoint(&on_disk) {
            tracing::debug!(path = %path.display(), "File matches reference snapshot");
            return Ok(Vec::new());
        }

        let disk_state = self.format.parse(&on_disk).map_err(|source| ScanError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let changes = self
            .document
            .read(|in_memory| self.diff.compute_diff(in_memory, &disk_state));
        tracing::debug!(path = %path.display(), changes = changes.len(), "Scan complete");
        Ok(changes)
    }

    /// An unreadable snapshot counts as a mismatch: the full diff may
    /// over-report, but detection keeps working.
    fn unchanged_since_checkpoint(&self, on_disk: &[u8]) -> bool {
        let Some(reference) = &self.reference else {
            return false;
        };
        let guard = reference.read().unwrap_or_else(|e| e.into_inner());
        let Some(snapshot) = guard.as_ref() else {
            return false;
        };
        match snapshot.matches(on_disk) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!(snapshot = %snapshot.path().display(), error = %e, "Reference snapshot unreadable, falling back to full diff");
                false
            }
        }
    }
}
