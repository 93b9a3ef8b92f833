//! Persistence for the single API credential.
//!
//! The credential lives under one fixed key in a small JSON key-value file,
//! next to `config.json`. Its presence decides which view the page shows.

use anyhow::{Result, anyhow};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;

pub const CREDENTIAL_KEY: &str = "groq_api_key";
pub const STORAGE_FILE: &str = "storage.json";

/// Read/write/clear access to the stored credential.
///
/// `read` returns `None` when nothing (or an empty string) is stored.
pub trait CredentialStore: Send {
    fn read(&self) -> Option<String>;
    fn write(&mut self, credential: &str) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

/// Credential store backed by a JSON object on disk.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    entries: Map<String, Value>,
}

impl FileCredentialStore {
    /// Opens the store at its default location in the config directory.
    pub fn open_default() -> Result<Self> {
        Self::open(Config::app_dir()?.join(STORAGE_FILE))
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)?;
            match serde_json::from_str::<Value>(&content)? {
                Value::Object(map) => map,
                _ => return Err(anyhow!("{} is not a JSON object", path.display())),
            }
        } else {
            Map::new()
        };

        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn read(&self) -> Option<String> {
        self.entries
            .get(CREDENTIAL_KEY)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    fn write(&mut self, credential: &str) -> Result<()> {
        self.entries
            .insert(CREDENTIAL_KEY.to_string(), Value::String(credential.to_string()));
        self.flush()?;
        tracing::info!(path = %self.path.display(), "stored credential");
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        if self.entries.remove(CREDENTIAL_KEY).is_some() {
            self.flush()?;
        }
        tracing::info!(path = %self.path.display(), "cleared credential");
        Ok(())
    }
}

/// In-memory store, used in tests and for one-off CLI runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    value: Option<String>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: &str) -> Self {
        Self {
            value: Some(credential.to_string()),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn read(&self) -> Option<String> {
        self.value.clone().filter(|s| !s.is_empty())
    }

    fn write(&mut self, credential: &str) -> Result<()> {
        self.value = Some(credential.to_string());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.value = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_round_trip() {
        let mut store = MemoryCredentialStore::new();
        assert_eq!(store.read(), None);

        store.write("gsk_test").unwrap();
        assert_eq!(store.read().as_deref(), Some("gsk_test"));

        store.clear().unwrap();
        assert_eq!(store.read(), None);
    }

    #[test]
    fn test_empty_value_reads_as_absent() {
        let mut store = MemoryCredentialStore::new();
        store.write("").unwrap();
        assert_eq!(store.read(), None);
    }

    #[test]
    fn test_file_round_trip_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("llm-chat").join(STORAGE_FILE);

        let mut store = FileCredentialStore::open(&path).unwrap();
        assert_eq!(store.read(), None);
        store.write("gsk_abc123").unwrap();
        assert_eq!(store.read().as_deref(), Some("gsk_abc123"));

        let reopened = FileCredentialStore::open(&path).unwrap();
        assert_eq!(reopened.read().as_deref(), Some("gsk_abc123"));
    }

    #[test]
    fn test_file_clear_removes_only_credential() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STORAGE_FILE);
        fs::write(&path, r#"{"theme":"dark","groq_api_key":"gsk_old"}"#).unwrap();

        let mut store = FileCredentialStore::open(&path).unwrap();
        assert_eq!(store.read().as_deref(), Some("gsk_old"));
        store.clear().unwrap();
        assert_eq!(store.read(), None);

        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["theme"], "dark");
        assert!(raw.get(CREDENTIAL_KEY).is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STORAGE_FILE);

        let mut store = FileCredentialStore::open(&path).unwrap();
        store.write("first").unwrap();
        store.write("second").unwrap();

        let reopened = FileCredentialStore::open(&path).unwrap();
        assert_eq!(reopened.read().as_deref(), Some("second"));
    }

    #[test]
    fn test_non_object_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STORAGE_FILE);
        fs::write(&path, "[1, 2, 3]").unwrap();

        assert!(FileCredentialStore::open(&path).is_err());
    }
}
