//! Offline favorite queue
//!
//! Favorites made while offline are appended to a JSON array under one
//! storage key. Entries leave the queue only when a flush containing them
//! has been confirmed by the server.

use super::LocalStorage;
use crate::utils::{Result, error::StorageError};

/// Queue of favorite identifiers awaiting synchronization
#[derive(Debug, Clone)]
pub struct FavoriteQueue {
    storage: LocalStorage,
    key: String,
}

impl FavoriteQueue {
    pub fn new(storage: LocalStorage, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current queue contents, oldest first
    pub fn load(&self) -> Result<Vec<String>> {
        decode(&self.key, self.storage.get_item(&self.key).as_deref())
    }

    /// Append an identifier, returning the new queue length
    pub fn push(&self, favorite_id: &str) -> Result<usize> {
        let mut len = 0;
        self.storage.update(&self.key, |raw| {
            let mut queue = decode(&self.key, raw)?;
            queue.push(favorite_id.to_string());
            len = queue.len();
            Ok(Some(serde_json::to_string(&queue)?))
        })?;
        Ok(len)
    }

    /// Drop the entries a confirmed flush delivered. Anything appended after
    /// the flush snapshot was taken stays queued.
    pub fn acknowledge(&self, flushed: &[String]) -> Result<()> {
        self.storage.update(&self.key, |raw| {
            let queue = decode(&self.key, raw)?;
            if !queue.starts_with(flushed) {
                return Err(StorageError::Corrupt {
                    key: self.key.clone(),
                    reason: "queue changed underneath a flush".into(),
                }
                .into());
            }
            let rest = &queue[flushed.len()..];
            if rest.is_empty() {
                Ok(None)
            } else {
                Ok(Some(serde_json::to_string(rest)?))
            }
        })
    }

    /// Remove every queued entry
    pub fn clear(&self) -> Result<()> {
        self.storage.remove_item(&self.key)
    }

    pub fn len(&self) -> usize {
        self.load().map(|q| q.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn decode(key: &str, raw: Option<&str>) -> Result<Vec<String>> {
    match raw {
        None => Ok(Vec::new()),
        Some(raw) => serde_json::from_str(raw).map_err(|e| {
            StorageError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            }
            .into()
        }),
    }
}
