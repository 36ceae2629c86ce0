//! Application-facing notification capability

use crate::diff::DatabaseChange;

/// Receives batches of external changes detected on a document.
///
/// Only ever called with a non-empty batch.
pub trait DatabaseChangeListener: Send + Sync {
    fn database_changed(&self, changes: &[DatabaseChange]);
}

impl<F> DatabaseChangeListener for F
where
    F: Fn(&[DatabaseChange]) + Send + Sync,
{
    fn database_changed(&self, changes: &[DatabaseChange]) {
        self(changes)
    }
}
