//! Persistent key-value state
//!
//! Every component that remembers something between sessions goes through
//! [`Persistence`]. The underlying [`Store`] is a plain string-keyed store;
//! values are JSON encoded on the way in and decoded on the way out.
//! Failures are logged and absorbed here so callers never have to handle them.

pub mod keys;
mod store;

use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

pub use store::{FileStore, MemoryStore, Store};

/// Errors raised by a [`Store`] implementation
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Reading or writing the backing file failed
    #[error("Storage I/O failed for {path:?}: {source}")]
    Io {
        /// File that could not be accessed
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored value could not be decoded
    #[error("Stored value for '{key}' is not valid: {source}")]
    Parse {
        /// Key whose value was rejected
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be encoded
    #[error("Failed to encode value for '{key}': {source}")]
    Encode {
        /// Key being written
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The write would grow the store past its size limit
    #[error("Storage quota exceeded: {size} bytes (limit {limit})")]
    QuotaExceeded {
        /// Size the store would have after the write
        size: usize,
        /// Configured limit
        limit: usize,
    },

    /// The store refuses writes entirely
    #[error("Storage is unavailable")]
    Unavailable,
}

/// Typed facade over a [`Store`]
///
/// `get` returns `None` for absent *and* unreadable values; `set` and `remove`
/// skip the write on failure. Both log the cause at `warn` level.
pub struct Persistence {
    store: Box<dyn Store>,
}

impl Persistence {
    /// Wrap a store
    pub fn new(store: impl Store + 'static) -> Self {
        Self { store: Box::new(store) }
    }

    /// A persistence layer that forgets everything on exit
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::default())
    }

    /// Read and decode a value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.read(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "Could not read stored value");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(source) => {
                let e = PersistenceError::Parse { key: key.to_string(), source };
                tracing::warn!(key, error = %e, "Ignoring unreadable stored value");
                None
            }
        }
    }

    /// Encode and write a value
    pub fn set<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(source) => {
                let e = PersistenceError::Encode { key: key.to_string(), source };
                tracing::warn!(key, error = %e, "Write skipped");
                return;
            }
        };

        if let Err(e) = self.store.write(key, &encoded) {
            tracing::warn!(key, error = %e, "Write skipped");
        }
    }

    /// Delete a value
    pub fn remove(&mut self, key: &str) {
        if let Err(e) = self.store.delete(key) {
            tracing::warn!(key, error = %e, "Remove skipped");
        }
    }
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn missing_key_is_none() {
        let persistence = Persistence::in_memory();
        assert_eq!(persistence.get::<u64>(keys::COPY_COUNT), None);
    }

    #[test]
    fn set_then_get_map() {
        let mut persistence = Persistence::in_memory();
        let mut usage = BTreeMap::new();
        usage.insert("Rust".to_string(), 3u64);
        persistence.set(keys::COPY_USAGE, &usage);

        let loaded: BTreeMap<String, u64> = persistence.get(keys::COPY_USAGE).unwrap();
        assert_eq!(loaded["Rust"], 3);
    }

    #[test]
    fn remove_clears_value() {
        let mut persistence = Persistence::in_memory();
        persistence.set(keys::SESSION_TIME, &120u64);
        persistence.remove(keys::SESSION_TIME);
        assert_eq!(persistence.get::<u64>(keys::SESSION_TIME), None);
    }

    #[test]
    fn garbage_value_reads_as_none() {
        let mut store = MemoryStore::default();
        store.write(keys::BOOKMARKS, "[not json").unwrap();
        let persistence = Persistence::new(store);
        assert_eq!(persistence.get::<Vec<String>>(keys::BOOKMARKS), None);
    }

    #[test]
    fn wrong_shape_reads_as_none() {
        let mut persistence = Persistence::in_memory();
        persistence.set(keys::COPY_COUNT, "seven");
        assert_eq!(persistence.get::<u64>(keys::COPY_COUNT), None);
    }

    #[test]
    fn unavailable_store_swallows_writes() {
        let mut persistence = Persistence::new(MemoryStore::unavailable());
        persistence.set(keys::COPY_COUNT, &1u64);
        persistence.remove(keys::COPY_COUNT);
        assert_eq!(persistence.get::<u64>(keys::COPY_COUNT), None);
    }
}
