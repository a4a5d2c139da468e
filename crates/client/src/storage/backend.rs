//! Storage backends.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::warn;

use super::StorageError;

/// Raw key/value operations behind a [`StorageArea`](super::StorageArea).
pub trait StorageBackend {
    /// # Errors
    ///
    /// Returns an error when the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// # Errors
    ///
    /// Returns an error when the value cannot be stored.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns an error when the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns an error when the backend cannot be read.
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

// =============================================================================
// MemoryBackend
// =============================================================================

#[derive(Debug, Default)]
struct MemoryState {
    entries: RefCell<BTreeMap<String, String>>,
    quota: Option<usize>,
    disabled: Cell<bool>,
}

/// In-memory storage, optionally limited to a byte quota.
///
/// Clones share the same entries, so a test can keep a handle and flip
/// [`set_disabled`](Self::set_disabled) after handing the backend over.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Rc<MemoryState>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the total size of keys plus values to `bytes`.
    #[must_use]
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            state: Rc::new(MemoryState {
                quota: Some(bytes),
                ..MemoryState::default()
            }),
        }
    }

    /// Make every operation fail, like storage blocked by privacy settings.
    pub fn set_disabled(&self, disabled: bool) {
        self.state.disabled.set(disabled);
    }

    fn check_enabled(&self) -> Result<(), StorageError> {
        if self.state.disabled.get() {
            Err(StorageError::Disabled)
        } else {
            Ok(())
        }
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_enabled()?;
        Ok(self.state.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_enabled()?;
        let mut entries = self.state.entries.borrow_mut();
        if let Some(quota) = self.state.quota {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded { needed, quota });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_enabled()?;
        self.state.entries.borrow_mut().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        self.check_enabled()?;
        Ok(self.state.entries.borrow().keys().cloned().collect())
    }
}

// =============================================================================
// FileBackend
// =============================================================================

/// Storage persisted as a JSON object in a single file.
///
/// A missing file reads as empty. A corrupt file fails reads; the next write
/// replaces it.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn read_map_for_write(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match self.read_map() {
            Err(StorageError::Corrupt(e)) => {
                warn!(path = %self.path.display(), error = %e, "Replacing corrupt storage file");
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_string_pretty(map)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut map = self.read_map_for_write()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut map = self.read_map_for_write()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.read_map()?.into_keys().collect())
    }
}
