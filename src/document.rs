//! Structured document model
//!
//! A document is a keyed list of records plus an optional free-text preamble.
//! The in-memory copy is shared between the interactive side and background
//! scans through [`MonitoredDocument`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use thiserror::Error;

use crate::format::{DocumentFormat, FormatError};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Document has no backing file")]
    Untracked,
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Format error: {0}")]
    Format(#[from] FormatError),
}

/// A single keyed entry of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl Record {
    pub fn new(key: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: kind.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// The application's structured view of a document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDatabase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preamble: Option<String>,
    #[serde(default)]
    pub records: Vec<Record>,
}

impl RecordDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            preamble: None,
            records,
        }
    }

    /// Parse a database from a file on disk
    pub fn load(path: &Path, format: &dyn DocumentFormat) -> Result<Self, DocumentError> {
        let bytes = std::fs::read(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(format.parse(&bytes)?)
    }

    pub fn get(&self, key: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.key == key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert a record, replacing any record with the same key in place.
    /// Returns the replaced record.
    pub fn upsert(&mut self, record: Record) -> Option<Record> {
        match self.records.iter_mut().find(|r| r.key == record.key) {
            Some(existing) => Some(std::mem::replace(existing, record)),
            None => {
                self.records.push(record);
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Record> {
        let index = self.records.iter().position(|r| r.key == key)?;
        Some(self.records.remove(index))
    }
}

/// A document under watch: optional backing path plus the live in-memory state.
///
/// Clones share the same in-memory state.
#[derive(Debug, Clone)]
pub struct MonitoredDocument {
    path: Option<PathBuf>,
    database: Arc<RwLock<RecordDatabase>>,
}

impl MonitoredDocument {
    pub fn new(path: impl Into<PathBuf>, database: RecordDatabase) -> Self {
        Self {
            path: Some(path.into()),
            database: Arc::new(RwLock::new(database)),
        }
    }

    /// A document that has never been saved; monitoring it is inert
    pub fn unsaved(database: RecordDatabase) -> Self {
        Self {
            path: None,
            database: Arc::new(RwLock::new(database)),
        }
    }

    /// Open a document from disk
    pub fn open(path: impl Into<PathBuf>, format: &dyn DocumentFormat) -> Result<Self, DocumentError> {
        let path = path.into();
        let database = RecordDatabase::load(&path, format)?;
        Ok(Self::new(path, database))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Clone of the current in-memory state
    pub fn snapshot(&self) -> RecordDatabase {
        self.read(|db| db.clone())
    }

    /// Run `f` against the in-memory state under a read lock
    pub fn read<R>(&self, f: impl FnOnce(&RecordDatabase) -> R) -> R {
        let guard = self.database.read().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    /// Run `f` against the in-memory state under a write lock
    pub fn update<R>(&self, f: impl FnOnce(&mut RecordDatabase) -> R) -> R {
        let mut guard = self.database.write().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    pub fn replace(&self, database: RecordDatabase) {
        self.update(|db| *db = database);
    }

    /// Write the in-memory state to the backing file
    pub fn save(&self, format: &dyn DocumentFormat) -> Result<(), DocumentError> {
        let path = self.path.as_ref().ok_or(DocumentError::Untracked)?;
        let bytes = self.read(|db| format.write(db))?;
        std::fs::write(path, bytes).map_err(|source| DocumentError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Document saved");
        Ok(())
    }
}
