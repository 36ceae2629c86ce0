//! docwatch - detect external edits to a document's backing file
//!
//! A [`DatabaseChangeMonitor`] watches one document's file, scans it in the
//! background when it changes, and reports semantic changes to listeners.
//! Collaborators (file watching, background execution) are injected through
//! the traits in [`traits`], with real implementations in [`production`] and
//! test doubles in [`mocks`].

pub mod config;
pub mod dbms;
pub mod diff;
pub mod document;
pub mod format;
pub mod logging;
pub mod mocks;
pub mod monitor;
pub mod production;
pub mod scanner;
pub mod snapshot;
pub mod task;
pub mod traits;

pub use diff::{DatabaseChange, DiffEngine, RecordDiffEngine};
pub use document::{MonitoredDocument, Record, RecordDatabase};
pub use format::{DocumentFormat, JsonDocumentFormat};
pub use monitor::{DatabaseChangeMonitor, MonitorState};
pub use scanner::{ChangeScanner, ScanError};
