//! String key/value store with optional file persistence

use crate::utils::{Result, error::StorageError};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// LocalStorage implementation
///
/// Clones share the same underlying map. When opened on a file, every write
/// is flushed to disk before the call returns.
#[derive(Debug, Default, Clone)]
pub struct LocalStorage {
    data: Arc<Mutex<BTreeMap<String, String>>>,
    path: Option<Arc<PathBuf>>,
}

impl LocalStorage {
    /// In-memory storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage backed by a JSON file; a missing file starts empty
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let raw = fs::read_to_string(&path)
                .map_err(|e| StorageError::Persistence(format!("{}: {}", path.display(), e)))?;
            serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
                key: path.display().to_string(),
                reason: e.to_string(),
            })?
        } else {
            BTreeMap::new()
        };

        log::debug!("Opened local storage at {} ({} keys)", path.display(), data.len());

        Ok(Self {
            data: Arc::new(Mutex::new(data)),
            path: Some(Arc::new(path)),
        })
    }

    pub fn get_item(&self, key: &str) -> Option<String> {
        self.data.lock().ok()?.get(key).cloned()
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.update(key, |_| Ok(Some(value.to_string())))
    }

    pub fn remove_item(&self, key: &str) -> Result<()> {
        self.update(key, |_| Ok(None))
    }

    pub fn clear(&self) -> Result<()> {
        let mut data = self.data.lock().map_err(|_| StorageError::Poisoned)?;
        data.clear();
        self.persist(&data)
    }

    pub fn length(&self) -> usize {
        self.data.lock().map(|d| d.len()).unwrap_or(0)
    }

    /// Read-modify-write one key under the lock. Returning `None` removes
    /// the key. If `f` fails nothing changes.
    pub fn update<F>(&self, key: &str, f: F) -> Result<()>
    where
        F: FnOnce(Option<&str>) -> Result<Option<String>>,
    {
        let mut data = self.data.lock().map_err(|_| StorageError::Poisoned)?;
        let next = f(data.get(key).map(String::as_str))?;
        let previous = match next {
            Some(value) => data.insert(key.to_string(), value),
            None => data.remove(key),
        };

        if let Err(e) = self.persist(&data) {
            // Keep memory and disk in agreement
            match previous {
                Some(value) => data.insert(key.to_string(), value),
                None => data.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn persist(&self, data: &BTreeMap<String, String>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let raw = serde_json::to_string_pretty(data)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, raw)
            .and_then(|_| fs::rename(&tmp, path.as_path()))
            .map_err(|e| StorageError::Persistence(format!("{}: {}", path.display(), e)).into())
    }
}
