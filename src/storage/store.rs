//! Backing stores

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::PersistenceError;

/// A string-keyed store of string values
pub trait Store {
    /// Read the raw value for a key
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    /// Write the raw value for a key
    fn write(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;

    /// Delete a key (absent keys are not an error)
    fn delete(&mut self, key: &str) -> Result<(), PersistenceError>;
}

/// Store kept entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    unavailable: bool,
}

impl MemoryStore {
    /// A store that rejects every write, like storage disabled by the host
    pub fn unavailable() -> Self {
        Self { entries: BTreeMap::new(), unavailable: true }
    }
}

impl Store for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        if self.unavailable {
            return Err(PersistenceError::Unavailable);
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), PersistenceError> {
        if self.unavailable {
            return Err(PersistenceError::Unavailable);
        }
        self.entries.remove(key);
        Ok(())
    }
}

/// Store persisted as a single JSON object file
///
/// The whole file is rewritten on every mutation. A write that fails leaves
/// the in-memory view unchanged.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
    quota: Option<usize>,
}

impl FileStore {
    /// Open the store at `path`; a missing or corrupt file starts empty
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "State file is corrupt, starting empty");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not read state file");
                BTreeMap::new()
            }
        };

        Self { path, entries, quota: None }
    }

    /// Limit the serialized size of the store in bytes
    pub fn with_quota(mut self, limit: usize) -> Self {
        self.quota = Some(limit);
        self
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), PersistenceError> {
        let contents = serde_json::to_string_pretty(entries)
            .map_err(|source| PersistenceError::Encode { key: "*".to_string(), source })?;

        if let Some(limit) = self.quota {
            if contents.len() > limit {
                return Err(PersistenceError::QuotaExceeded { size: contents.len(), limit });
            }
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|source| PersistenceError::Io { path: parent.to_path_buf(), source })?;
        }

        std::fs::write(&self.path, contents)
            .map_err(|source| PersistenceError::Io { path: self.path.clone(), source })
    }
}

impl Store for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let mut next = self.entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next)?;
        self.entries = next;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), PersistenceError> {
        if !self.entries.contains_key(key) {
            return Ok(());
        }
        let mut next = self.entries.clone();
        next.remove(key);
        self.flush(&next)?;
        self.entries = next;
        Ok(())
    }
}
