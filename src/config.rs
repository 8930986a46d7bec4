//! Runtime configuration
//!
//! Loaded from JSON; every field is optional and falls back to the
//! constants below.

use crate::service_worker::RetryPolicy;
use crate::utils::{Result, ShowroomError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default values
pub mod defaults {
    /// Versioned cache name; bump to invalidate every installed asset
    pub const CACHE_NAME: &str = "showroom-v1";
    pub const ORIGIN: &str = "http://localhost:3000";
    pub const SYNC_ENDPOINT: &str = "/api/favorites/sync";
    pub const SYNC_TAG: &str = "sync-favorites";
    pub const FAVORITES_KEY: &str = "offlineFavorites";
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
    /// App shell, bundle, stylesheet and manifest
    pub const PRECACHE_ASSETS: &[&str] = &[
        "/",
        "/index.html",
        "/static/js/bundle.js",
        "/static/css/main.css",
        "/manifest.json",
    ];
}

/// Environment variable overriding [`ShowroomConfig::origin`]
pub const ORIGIN_ENV: &str = "SHOWROOM_ORIGIN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShowroomConfig {
    /// Site origin root-relative paths resolve against
    pub origin: String,
    pub cache_name: String,
    pub precache_assets: Vec<String>,
    pub sync_endpoint: String,
    pub sync_tag: String,
    /// Local storage key holding the favorite queue
    pub favorites_key: String,
    /// Persist local storage here; in-memory when unset
    pub storage_path: Option<PathBuf>,
    pub request_timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for ShowroomConfig {
    fn default() -> Self {
        Self {
            origin: defaults::ORIGIN.to_string(),
            cache_name: defaults::CACHE_NAME.to_string(),
            precache_assets: defaults::PRECACHE_ASSETS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            sync_endpoint: defaults::SYNC_ENDPOINT.to_string(),
            sync_tag: defaults::SYNC_TAG.to_string(),
            favorites_key: defaults::FAVORITES_KEY.to_string(),
            storage_path: None,
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
            retry: RetryPolicy::default(),
        }
    }
}

impl ShowroomConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    /// Apply environment overrides
    pub fn with_env(mut self) -> Self {
        if let Ok(origin) = std::env::var(ORIGIN_ENV) {
            self.origin = origin;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.origin_url()?;
        if self.cache_name.trim().is_empty() {
            return Err(ShowroomError::Config("cache_name must not be empty".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ShowroomError::Config("retry.max_attempts must be at least 1".into()));
        }
        for asset in &self.precache_assets {
            self.resolve(asset)?;
        }
        self.resolve(&self.sync_endpoint)?;
        Ok(())
    }

    pub fn origin_url(&self) -> Result<Url> {
        Url::parse(&self.origin)
            .map_err(|e| ShowroomError::Config(format!("invalid origin {}: {}", self.origin, e)))
    }

    /// Resolve a root-relative path against the origin
    pub fn resolve(&self, path: &str) -> Result<Url> {
        self.origin_url()?
            .join(path)
            .map_err(|e| ShowroomError::Config(format!("invalid path {}: {}", path, e)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
