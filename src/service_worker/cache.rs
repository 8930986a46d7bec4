//! Named response caches
//!
//! A [`CacheStorage`] holds any number of named caches; each maps an exact
//! request URL to a stored response. Entries are only ever written whole, by
//! install, and are never refreshed from runtime traffic.

use crate::network::Response;
use crate::utils::{Result, error::CacheError};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// One named cache. Written once by [`CacheStorage::put_all`], then only read.
#[derive(Debug, Default)]
pub struct Cache {
    entries: HashMap<String, Response>,
}

impl Cache {
    /// Exact URL lookup
    pub fn match_url(&self, url: &str) -> Option<Response> {
        self.entries.get(url).cloned()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    /// Cached URLs, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn size_bytes(&self) -> usize {
        self.entries.values().map(|r| r.body().len()).sum()
    }
}

/// All caches owned by one service worker
#[derive(Debug, Default)]
pub struct CacheStorage {
    caches: RwLock<HashMap<String, Arc<Cache>>>,
}

impl CacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cache by name
    pub fn open(&self, name: &str) -> Option<Arc<Cache>> {
        self.caches.read().ok()?.get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.open(name).is_some()
    }

    /// Store a complete set of entries under `name`, replacing any previous
    /// cache of that name in one step
    pub fn put_all(&self, name: &str, entries: Vec<(String, Response)>) -> Result<Arc<Cache>> {
        let cache = Arc::new(Cache {
            entries: entries.into_iter().collect(),
        });
        self.caches
            .write()
            .map_err(|_| CacheError::Poisoned)?
            .insert(name.to_string(), Arc::clone(&cache));
        Ok(cache)
    }

    /// Delete a cache, returning whether it existed
    pub fn delete(&self, name: &str) -> bool {
        self.caches
            .write()
            .map(|mut c| c.remove(name).is_some())
            .unwrap_or(false)
    }

    /// Delete every cache except `keep`, returning the deleted names
    pub fn retain_only(&self, keep: &str) -> Result<Vec<String>> {
        let mut caches = self.caches.write().map_err(|_| CacheError::Poisoned)?;
        let mut stale: Vec<String> = caches.keys().filter(|n| *n != keep).cloned().collect();
        stale.sort();
        for name in &stale {
            caches.remove(name);
        }
        Ok(stale)
    }

    /// Cache names, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .caches
            .read()
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn stats(&self) -> CacheStats {
        let caches = self
            .caches
            .read()
            .map(|c| c.values().cloned().collect::<Vec<_>>())
            .unwrap_or_default();

        CacheStats {
            caches: caches.len(),
            entries: caches.iter().map(|c| c.len()).sum(),
            size_bytes: caches.iter().map(|c| c.size_bytes()).sum(),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of named caches
    pub caches: usize,
    /// Entries across all caches
    pub entries: usize,
    /// Total body size in bytes
    pub size_bytes: usize,
}
