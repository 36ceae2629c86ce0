//! Reference snapshot: a private byte copy of a file at the last checkpoint

use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::config::SnapshotConfig;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Could not create reference snapshot of {path}: {source}")]
    Creation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Could not refresh reference snapshot from {path}: {source}")]
    Checkpoint {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Could not read reference snapshot: {0}")]
    Read(#[source] io::Error),
}

/// Copy `source` over `destination`.
///
/// With `overwrite == false` an existing destination is an `AlreadyExists` error.
pub fn copy_file(source: &Path, destination: &Path, overwrite: bool) -> io::Result<()> {
    if !overwrite && destination.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", destination.display()),
        ));
    }
    std::fs::copy(source, destination)?;
    Ok(())
}

/// Temp-file-backed copy of a document's on-disk bytes.
///
/// The backing file is deleted when the snapshot is dropped.
#[derive(Debug)]
pub struct ReferenceSnapshot {
    file: NamedTempFile,
    taken_at: DateTime<Utc>,
}

impl ReferenceSnapshot {
    /// Materialize a new snapshot of `source`
    pub fn capture(source: &Path, config: &SnapshotConfig) -> Result<Self, SnapshotError> {
        let creation = |e: io::Error| SnapshotError::Creation {
            path: source.to_path_buf(),
            source: e,
        };

        let mut builder = tempfile::Builder::new();
        builder.prefix(&config.prefix).suffix(&config.suffix);
        let file = match &config.dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(creation)?;

        copy_file(source, file.path(), true).map_err(creation)?;

        tracing::debug!(
            source = %source.display(),
            snapshot = %file.path().display(),
            "Captured reference snapshot"
        );
        Ok(Self {
            file,
            taken_at: Utc::now(),
        })
    }

    /// Overwrite the snapshot with the current content of `source`
    pub fn refresh(&mut self, source: &Path) -> Result<(), SnapshotError> {
        copy_file(source, self.file.path(), true).map_err(|e| SnapshotError::Checkpoint {
            path: source.to_path_buf(),
            source: e,
        })?;
        self.taken_at = Utc::now();
        Ok(())
    }

    pub fn read(&self) -> Result<Vec<u8>, SnapshotError> {
        std::fs::read(self.file.path()).map_err(SnapshotError::Read)
    }

    /// Whether `bytes` equal the snapshot content
    pub fn matches(&self, bytes: &[u8]) -> Result<bool, SnapshotError> {
        Ok(self.read()? == bytes)
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> SnapshotConfig {
        SnapshotConfig {
            dir: Some(dir.path().to_path_buf()),
            ..SnapshotConfig::default()
        }
    }

    #[test]
    fn test_copy_file_respects_overwrite_flag() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.json");
        let dest = dir.path().join("b.json");
        std::fs::write(&source, "new").unwrap();
        std::fs::write(&dest, "old").unwrap();

        let err = copy_file(&source, &dest, false).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "old");

        copy_file(&source, &dest, true).unwrap();
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "new");
    }

    #[test]
    fn test_capture_copies_bytes() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("doc.json");
        std::fs::write(&source, b"{\"records\": []}").unwrap();

        let snapshot = ReferenceSnapshot::capture(&source, &config_in(&dir)).unwrap();

        assert!(snapshot.matches(b"{\"records\": []}").unwrap());
        assert!(!snapshot.matches(b"{}").unwrap());
        let name = snapshot.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("docwatch-"));
        assert!(name.ends_with(".snapshot"));
    }

    #[test]
    fn test_capture_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let result = ReferenceSnapshot::capture(&dir.path().join("missing.json"), &config_in(&dir));
        assert!(matches!(result, Err(SnapshotError::Creation { .. })));
    }

    #[test]
    fn test_refresh_overwrites() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("doc.json");
        std::fs::write(&source, "v1").unwrap();
        let mut snapshot = ReferenceSnapshot::capture(&source, &config_in(&dir)).unwrap();
        let first = snapshot.taken_at();

        std::fs::write(&source, "version two").unwrap();
        snapshot.refresh(&source).unwrap();

        assert_eq!(snapshot.read().unwrap(), b"version two");
        assert!(snapshot.taken_at() >= first);
    }

    #[test]
    fn test_refresh_from_missing_source_keeps_old_content() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("doc.json");
        std::fs::write(&source, "v1").unwrap();
        let mut snapshot = ReferenceSnapshot::capture(&source, &config_in(&dir)).unwrap();

        std::fs::remove_file(&source).unwrap();

        assert!(matches!(
            snapshot.refresh(&source),
            Err(SnapshotError::Checkpoint { .. })
        ));
        assert_eq!(snapshot.read().unwrap(), b"v1");
    }

    #[test]
    fn test_drop_deletes_backing_file() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("doc.json");
        std::fs::write(&source, "v1").unwrap();
        let snapshot = ReferenceSnapshot::capture(&source, &config_in(&dir)).unwrap();
        let path = snapshot.path().to_path_buf();

        drop(snapshot);

        assert!(!path.exists());
    }
}
