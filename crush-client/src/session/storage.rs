//! Durable client storage for the session
//!
//! Two independent string entries, the session token and the identity, kept
//! in a small key/value document. Writes of several entries go through
//! [`SessionStorage::write_all`] so a backend can make them atomic.

use crush_common::config::write_atomic;
use crush_common::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Entry holding the session token
pub const TOKEN_KEY: &str = "session_token";

/// Entry holding the session identity (email)
pub const IDENTITY_KEY: &str = "identity";

/// Key/value storage that survives process restarts
pub trait SessionStorage: Send + Sync {
    /// Read one entry
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Write several entries in one step
    fn write_all(&self, entries: &[(&str, &str)]) -> Result<()>;

    /// Remove several entries in one step; missing entries are ignored
    fn remove_all(&self, keys: &[&str]) -> Result<()>;
}

impl<S: SessionStorage + ?Sized> SessionStorage for std::sync::Arc<S> {
    fn read(&self, key: &str) -> Result<Option<String>> {
        (**self).read(key)
    }

    fn write_all(&self, entries: &[(&str, &str)]) -> Result<()> {
        (**self).write_all(entries)
    }

    fn remove_all(&self, keys: &[&str]) -> Result<()> {
        (**self).remove_all(keys)
    }
}

// ========================================
// In-memory backend
// ========================================

/// Process-local storage, for tests and ephemeral runs
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated storage
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            entries: Mutex::new(map),
        }
    }

    /// Snapshot of all entries
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SessionStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn write_all(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut map = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in entries {
            map.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> Result<()> {
        let mut map = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

// ========================================
// File backend
// ========================================

/// TOML document of string entries on disk
///
/// Every write replaces the whole document atomically (temp file + rename),
/// so a batch of entries is never half-written. The file is removed once
/// its last entry is.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        toml::from_str(&content).map_err(|e| {
            Error::Storage(format!(
                "Session file {} is unreadable: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn store(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if entries.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path)?;
                debug!(path = %self.path.display(), "Session file removed");
            }
            return Ok(());
        }

        let content = toml::to_string(entries)
            .map_err(|e| Error::Storage(format!("Serialize session failed: {}", e)))?;
        write_atomic(&self.path, content.as_bytes())
    }
}

impl SessionStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn write_all(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut map = self.load().unwrap_or_default();
        for (key, value) in entries {
            map.insert((*key).to_string(), (*value).to_string());
        }
        self.store(&map)
    }

    fn remove_all(&self, keys: &[&str]) -> Result<()> {
        let mut map = self.load().unwrap_or_default();
        for key in keys {
            map.remove(*key);
        }
        self.store(&map)
    }
}
