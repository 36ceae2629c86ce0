//! SQLite-backed settings store and typed monitor configuration

use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

impl From<rusqlite::Error> for SettingsError {
    fn from(e: rusqlite::Error) -> Self {
        SettingsError::DatabaseError(e.to_string())
    }
}

pub const DEBOUNCE_MS_KEY: &str = "watch.debounce_ms";
pub const SNAPSHOT_DIR_KEY: &str = "snapshot.dir";
pub const SNAPSHOT_PREFIX_KEY: &str = "snapshot.prefix";
pub const SNAPSHOT_SUFFIX_KEY: &str = "snapshot.suffix";

/// Key/value settings persisted in SQLite
pub struct SettingsStore {
    conn: Mutex<Connection>,
}

impl SettingsStore {
    fn init_table(conn: &Connection) -> Result<(), SettingsError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Open or create a settings database
    pub fn open(path: &Path) -> Result<Self, SettingsError> {
        let conn = Connection::open(path)?;
        Self::init_table(&conn)?;
        tracing::debug!(path = %path.display(), "Opened settings store");
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory() -> Result<Self, SettingsError> {
        let conn = Connection::open_in_memory()?;
        Self::init_table(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        let conn = self.connection();
        let result = conn.query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        );
        let ret = match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(SettingsError::from(e)),
        };
        tracing::debug!(key = %key, found = ret.as_ref().ok().and_then(|v| v.as_ref()).is_some(), "Settings get");
        ret
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        tracing::debug!(key = %key, "Settings set");
        let now = chrono::Utc::now().timestamp();
        self.connection().execute(
            "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, now],
        )?;
        Ok(())
    }

    pub fn get_u64(&self, key: &str) -> Result<Option<u64>, SettingsError> {
        match self.get(key)? {
            None => Ok(None),
            Some(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| SettingsError::InvalidValue {
                    key: key.to_string(),
                    value,
                }),
        }
    }
}

/// Where and how reference snapshots are materialized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotConfig {
    /// `None` uses the system temp directory
    pub dir: Option<PathBuf>,
    pub prefix: String,
    pub suffix: String,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            dir: None,
            prefix: "docwatch-".to_string(),
            suffix: ".snapshot".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Quiet period the production watcher waits before reporting a change
    pub debounce: Duration,
    pub snapshot: SnapshotConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            snapshot: SnapshotConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Build from stored settings, falling back to defaults for missing keys
    pub fn from_settings(settings: &SettingsStore) -> Result<Self, SettingsError> {
        let mut config = Self::default();
        if let Some(ms) = settings.get_u64(DEBOUNCE_MS_KEY)? {
            config.debounce = Duration::from_millis(ms);
        }
        if let Some(dir) = settings.get(SNAPSHOT_DIR_KEY)? {
            config.snapshot.dir = Some(PathBuf::from(dir));
        }
        if let Some(prefix) = settings.get(SNAPSHOT_PREFIX_KEY)? {
            config.snapshot.prefix = prefix;
        }
        if let Some(suffix) = settings.get(SNAPSHOT_SUFFIX_KEY)? {
            config.snapshot.suffix = suffix;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let settings = SettingsStore::open_in_memory().unwrap();

        settings.set(SNAPSHOT_PREFIX_KEY, "lib-").unwrap();

        assert_eq!(settings.get(SNAPSHOT_PREFIX_KEY).unwrap(), Some("lib-".to_string()));
    }

    #[test]
    fn test_get_missing_key() {
        let settings = SettingsStore::open_in_memory().unwrap();
        assert_eq!(settings.get("nonexistent_key").unwrap(), None);
    }

    #[test]
    fn test_set_overwrites() {
        let settings = SettingsStore::open_in_memory().unwrap();

        settings.set(SNAPSHOT_SUFFIX_KEY, ".orig").unwrap();
        settings.set(SNAPSHOT_SUFFIX_KEY, ".ref").unwrap();

        assert_eq!(settings.get(SNAPSHOT_SUFFIX_KEY).unwrap(), Some(".ref".to_string()));
    }

    #[test]
    fn test_get_u64_rejects_garbage() {
        let settings = SettingsStore::open_in_memory().unwrap();
        settings.set(DEBOUNCE_MS_KEY, "soon").unwrap();

        match settings.get_u64(DEBOUNCE_MS_KEY) {
            Err(SettingsError::InvalidValue { key, value }) => {
                assert_eq!(key, DEBOUNCE_MS_KEY);
                assert_eq!(value, "soon");
            }
            other => panic!("Expected invalid value, got {:?}", other),
        }
    }

    #[test]
    fn test_monitor_config_defaults() {
        let settings = SettingsStore::open_in_memory().unwrap();
        assert_eq!(
            MonitorConfig::from_settings(&settings).unwrap(),
            MonitorConfig::default()
        );
    }

    #[test]
    fn test_monitor_config_from_settings() {
        let settings = SettingsStore::open_in_memory().unwrap();
        settings.set(DEBOUNCE_MS_KEY, "50").unwrap();
        settings.set(SNAPSHOT_DIR_KEY, "/var/tmp/docwatch").unwrap();
        settings.set(SNAPSHOT_SUFFIX_KEY, ".ref").unwrap();

        let config = MonitorConfig::from_settings(&settings).unwrap();

        assert_eq!(config.debounce, Duration::from_millis(50));
        assert_eq!(config.snapshot.dir, Some(PathBuf::from("/var/tmp/docwatch")));
        assert_eq!(config.snapshot.prefix, "docwatch-");
        assert_eq!(config.snapshot.suffix, ".ref");
    }

    #[test]
    fn test_open_persists_to_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.sqlite");

        SettingsStore::open(&path).unwrap().set("k", "v").unwrap();

        assert_eq!(SettingsStore::open(&path).unwrap().get("k").unwrap(), Some("v".to_string()));
    }
}
