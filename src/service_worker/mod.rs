//! Offline cache and favorite sync
//!
//! A service-worker style component with three jobs:
//!
//! - **install**: pre-cache a fixed asset list into a named, versioned cache,
//!   all or nothing
//! - **fetch**: answer requests cache-first by exact URL, falling through to
//!   the network on a miss without caching the result
//! - **sync**: flush the offline favorite queue to the server, keeping it on
//!   failure
//!
//! The cache storage and favorite queue belong to the [`ServiceWorker`] and
//! are only reachable through it.

mod cache;
mod retry;
mod sync;

pub use cache::{Cache, CacheStats, CacheStorage};
pub use retry::RetryPolicy;
pub use sync::{FavoriteSync, SyncOutcome};

use crate::config::ShowroomConfig;
use crate::network::{Fetcher, HttpFetcher, Method, Request, Response};
use crate::platform::Capabilities;
use crate::storage::{FavoriteQueue, LocalStorage};
use crate::utils::{Result, ShowroomError, error::CacheError};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; this worker will never control requests
    Redundant,
}

/// Where a fetch was answered from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    Cache,
    Network,
}

/// How a favorite sync was scheduled
#[derive(Debug)]
pub enum SyncSchedule {
    /// Host background sync will fire the event
    Registered,
    /// No host support; an explicit retry loop is running
    Spawned(JoinHandle<SyncOutcome>),
}

pub struct ServiceWorker {
    config: ShowroomConfig,
    caches: CacheStorage,
    fetcher: Arc<dyn Fetcher>,
    sync: FavoriteSync,
    capabilities: Capabilities,
    state: Mutex<WorkerState>,
}

impl ServiceWorker {
    pub fn new(
        config: ShowroomConfig,
        fetcher: Arc<dyn Fetcher>,
        storage: LocalStorage,
        capabilities: Capabilities,
    ) -> Result<Self> {
        config.validate()?;
        let queue = FavoriteQueue::new(storage, config.favorites_key.clone());
        let sync = FavoriteSync::new(
            Arc::clone(&fetcher),
            queue,
            config.resolve(&config.sync_endpoint)?,
            config.retry.clone(),
        );

        Ok(Self {
            config,
            caches: CacheStorage::new(),
            fetcher,
            sync,
            capabilities,
            state: Mutex::new(WorkerState::Parsed),
        })
    }

    /// Build with the real network and configured storage
    pub fn from_config(config: ShowroomConfig) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(config.request_timeout())?);
        let storage = match &config.storage_path {
            Some(path) => LocalStorage::open(path)?,
            None => LocalStorage::new(),
        };
        Self::new(config, fetcher, storage, Capabilities::none())
    }

    pub fn state(&self) -> WorkerState {
        self.state.lock().map(|s| *s).unwrap_or(WorkerState::Redundant)
    }

    fn set_state(&self, next: WorkerState) {
        if let Ok(mut state) = self.state.lock() {
            log::info!("Service worker {:?} -> {:?}", *state, next);
            *state = next;
        }
    }

    pub fn config(&self) -> &ShowroomConfig {
        &self.config
    }

    pub fn caches(&self) -> &CacheStorage {
        &self.caches
    }

    pub fn favorites(&self) -> &FavoriteQueue {
        self.sync.queue()
    }

    /// Pre-cache every configured asset. Nothing is stored unless every
    /// asset was fetched with a 2xx status.
    pub async fn install(&self) -> Result<()> {
        self.set_state(WorkerState::Installing);

        match self.fetch_precache().await {
            Ok(entries) => {
                let count = entries.len();
                self.caches.put_all(&self.config.cache_name, entries)?;
                log::info!("Cached {} assets in {}", count, self.config.cache_name);
                self.set_state(WorkerState::Installed);
                Ok(())
            }
            Err(e) => {
                log::warn!("Install failed: {}", e);
                self.set_state(WorkerState::Redundant);
                Err(e)
            }
        }
    }

    async fn fetch_precache(&self) -> Result<Vec<(String, Response)>> {
        let urls = self
            .config
            .precache_assets
            .iter()
            .map(|path| self.config.resolve(path))
            .collect::<Result<Vec<_>>>()?;

        let fetches = urls.into_iter().map(|url| async move {
            let key = url.to_string();
            let request = Request::from_url(Method::Get, url);
            let failed = |reason: String| CacheError::InstallFailed {
                url: key.clone(),
                reason,
            };
            let response = self
                .fetcher
                .fetch(&request)
                .await
                .map_err(|e| ShowroomError::from(failed(e.to_string())))?;
            if !response.is_success() {
                return Err(ShowroomError::from(failed(format!(
                    "HTTP {}",
                    response.status()
                ))));
            }
            Ok::<_, ShowroomError>((key, response))
        });

        futures::future::join_all(fetches)
            .await
            .into_iter()
            .collect()
    }

    /// Drop every cache but the current version
    pub fn activate(&self) -> Result<Vec<String>> {
        let state = self.state();
        if state != WorkerState::Installed {
            return Err(CacheError::InvalidState {
                action: "activate",
                state,
            }
            .into());
        }

        self.set_state(WorkerState::Activating);
        let deleted = self.caches.retain_only(&self.config.cache_name)?;
        for name in &deleted {
            log::info!("Deleted stale cache {}", name);
        }
        self.set_state(WorkerState::Activated);
        Ok(deleted)
    }

    /// Cache-first fetch
    pub async fn handle_fetch(&self, request: &Request) -> Result<Response> {
        self.handle_fetch_with_source(request)
            .await
            .map(|(response, _)| response)
    }

    /// Cache-first fetch, also reporting where the response came from
    pub async fn handle_fetch_with_source(
        &self,
        request: &Request,
    ) -> Result<(Response, FetchSource)> {
        if request.method() == Method::Get {
            let hit = self
                .caches
                .open(&self.config.cache_name)
                .and_then(|cache| cache.match_url(request.url().as_str()));
            if let Some(response) = hit {
                log::debug!("Cache hit {}", request.url());
                return Ok((response, FetchSource::Cache));
            }
        }

        log::debug!("Cache miss {}, going to network", request.url());
        let response = self.fetcher.fetch(request).await?;
        Ok((response, FetchSource::Network))
    }

    /// Queue a favorite made while offline and ask the host for a sync
    /// if it can provide one
    pub fn queue_favorite(&self, favorite_id: &str) -> Result<usize> {
        let len = self.sync.queue().push(favorite_id)?;
        if let Some(manager) = self.capabilities.background_sync() {
            if let Err(e) = manager.register(&self.config.sync_tag) {
                log::warn!("Background sync registration failed: {}", e);
            }
        }
        Ok(len)
    }

    /// Handle a sync event
    pub async fn handle_sync(&self, tag: &str) -> SyncOutcome {
        if tag != self.config.sync_tag {
            log::debug!("Ignoring sync event {}", tag);
            return SyncOutcome::Ignored;
        }
        self.sync.flush().await
    }

    /// Make sure the queue gets flushed eventually: hand the job to the
    /// host's background sync when present, otherwise run the retry policy
    pub fn schedule_sync(self: &Arc<Self>) -> SyncSchedule {
        if let Some(manager) = self.capabilities.background_sync() {
            match manager.register(&self.config.sync_tag) {
                Ok(()) => return SyncSchedule::Registered,
                Err(e) => log::warn!("Background sync unavailable ({}), retrying locally", e),
            }
        }

        let worker = Arc::clone(self);
        SyncSchedule::Spawned(tokio::spawn(async move {
            worker.sync.flush_with_retry().await
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::MemoryFetcher;
    use crate::platform::MockSyncManager;

    const ORIGIN: &str = "https://shop.example";

    fn config(assets: &[&str]) -> ShowroomConfig {
        ShowroomConfig {
            origin: ORIGIN.to_string(),
            precache_assets: assets.iter().map(|s| s.to_string()).collect(),
            retry: RetryPolicy::immediate(2),
            ..ShowroomConfig::default()
        }
    }

    fn worker(config: ShowroomConfig) -> (MemoryFetcher, ServiceWorker) {
        let fetcher = MemoryFetcher::new();
        let worker = ServiceWorker::new(
            config,
            Arc::new(fetcher.clone()),
            LocalStorage::new(),
            Capabilities::none(),
        )
        .unwrap();
        (fetcher, worker)
    }

    #[tokio::test]
    async fn test_install_caches_all_assets() {
        let (fetcher, sw) = worker(config(&["/", "/manifest.json"]));
        fetcher.route(Method::Get, "https://shop.example/", Response::new(200, "<html>"));
        fetcher.route(
            Method::Get,
            "https://shop.example/manifest.json",
            Response::new(200, "{}"),
        );

        sw.install().await.unwrap();
        assert_eq!(sw.state(), WorkerState::Installed);
        let cache = sw.caches().open("showroom-v1").unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing() {
        let (fetcher, sw) = worker(config(&["/", "/missing.js"]));
        fetcher.route(Method::Get, "https://shop.example/", Response::new(200, "<html>"));

        let err = sw.install().await.unwrap_err();
        assert!(matches!(
            err,
            ShowroomError::Cache(CacheError::InstallFailed { ref url, .. }) if url.ends_with("/missing.js")
        ));
        assert_eq!(sw.state(), WorkerState::Redundant);
        assert!(!sw.caches().has("showroom-v1"));
    }

    #[tokio::test]
    async fn test_activate_requires_install() {
        let (_, sw) = worker(config(&[]));
        let err = sw.activate().unwrap_err();
        assert!(matches!(
            err,
            ShowroomError::Cache(CacheError::InvalidState {
                action: "activate",
                state: WorkerState::Parsed,
            })
        ));
    }

    #[tokio::test]
    async fn test_activate_drops_old_versions() {
        let (_, sw) = worker(config(&[]));
        sw.caches().put_all("showroom-v0", vec![]).unwrap();
        sw.install().await.unwrap();

        assert_eq!(sw.activate().unwrap(), vec!["showroom-v0"]);
        assert_eq!(sw.state(), WorkerState::Activated);
        assert_eq!(sw.caches().keys(), vec!["showroom-v1"]);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let (fetcher, sw) = worker(config(&["/"]));
        fetcher.route(Method::Get, "https://shop.example/", Response::new(200, "<html>"));
        sw.install().await.unwrap();
        let after_install = fetcher.request_count();

        fetcher.set_offline(true);
        let request = Request::get("https://shop.example/").unwrap();
        let (response, source) = sw.handle_fetch_with_source(&request).await.unwrap();
        assert_eq!(source, FetchSource::Cache);
        assert_eq!(response.text(), "<html>");
        assert_eq!(fetcher.request_count(), after_install);
    }

    #[tokio::test]
    async fn test_miss_goes_to_network_and_is_not_cached() {
        let (fetcher, sw) = worker(config(&[]));
        sw.install().await.unwrap();
        fetcher.route(
            Method::Get,
            "https://shop.example/api/vehicles",
            Response::new(200, "[]"),
        );

        let request = Request::get("https://shop.example/api/vehicles").unwrap();
        let (_, source) = sw.handle_fetch_with_source(&request).await.unwrap();
        assert_eq!(source, FetchSource::Network);
        let (_, source) = sw.handle_fetch_with_source(&request).await.unwrap();
        assert_eq!(source, FetchSource::Network);
        assert_eq!(fetcher.request_count(), 2);
    }

    #[tokio::test]
    async fn test_post_bypasses_cache() {
        let (fetcher, sw) = worker(config(&["/"]));
        fetcher.route(Method::Get, "https://shop.example/", Response::new(200, "<html>"));
        sw.install().await.unwrap();

        let request = Request::post("https://shop.example/").unwrap();
        let response = sw.handle_fetch(&request).await.unwrap();
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_sync_tag_filtering() {
        let (_, sw) = worker(config(&[]));
        sw.queue_favorite("camry").unwrap();
        assert_eq!(sw.handle_sync("something-else").await, SyncOutcome::Ignored);
        assert_eq!(sw.favorites().len(), 1);
    }

    #[tokio::test]
    async fn test_queue_favorite_registers_with_host() {
        let mut manager = MockSyncManager::new();
        manager.expect_register().times(1).returning(|_| Ok(()));

        let sw = ServiceWorker::new(
            config(&[]),
            Arc::new(MemoryFetcher::new()),
            LocalStorage::new(),
            Capabilities::none().with_background_sync(Arc::new(manager)),
        )
        .unwrap();

        assert_eq!(sw.queue_favorite("supra").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_schedule_sync_prefers_host() {
        let mut manager = MockSyncManager::new();
        manager.expect_register().times(1).returning(|_| Ok(()));

        let sw = Arc::new(
            ServiceWorker::new(
                config(&[]),
                Arc::new(MemoryFetcher::new()),
                LocalStorage::new(),
                Capabilities::none().with_background_sync(Arc::new(manager)),
            )
            .unwrap(),
        );

        assert!(matches!(sw.schedule_sync(), SyncSchedule::Registered));
    }

    #[tokio::test]
    async fn test_schedule_sync_falls_back_to_retry() {
        let (fetcher, sw) = worker(config(&[]));
        fetcher.route(
            Method::Post,
            "https://shop.example/api/favorites/sync",
            Response::new(200, "{}"),
        );
        sw.queue_favorite("camry").unwrap();

        let sw = Arc::new(sw);
        match sw.schedule_sync() {
            SyncSchedule::Spawned(handle) => {
                assert_eq!(handle.await.unwrap(), SyncOutcome::Flushed(1));
            }
            SyncSchedule::Registered => panic!("no host sync was offered"),
        }
        assert!(sw.favorites().is_empty());
    }
}
