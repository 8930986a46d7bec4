//! Favorite queue synchronization

use super::RetryPolicy;
use crate::network::{Fetcher, Method, Request};
use crate::storage::FavoriteQueue;
use crate::utils::Result;
use crate::utils::error::NetworkError;
use serde::Serialize;
use std::sync::Arc;
use url::Url;

/// Result of one sync pass. Failures are reported here and logged, never
/// raised: nobody is watching when a background sync runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Event tag was not ours
    Ignored,
    /// Nothing queued, nothing sent
    Empty,
    /// Server confirmed this many favorites; they left the queue
    Flushed(usize),
    /// Flush failed; the queue is untouched
    Failed(String),
}

impl SyncOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

#[derive(Serialize)]
struct SyncBody<'a> {
    favorites: &'a [String],
}

/// Flushes the favorite queue to the sync endpoint
pub struct FavoriteSync {
    fetcher: Arc<dyn Fetcher>,
    queue: FavoriteQueue,
    endpoint: Url,
    policy: RetryPolicy,
}

impl FavoriteSync {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        queue: FavoriteQueue,
        endpoint: Url,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            fetcher,
            queue,
            endpoint,
            policy,
        }
    }

    pub fn queue(&self) -> &FavoriteQueue {
        &self.queue
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// One flush attempt
    pub async fn flush(&self) -> SyncOutcome {
        match self.try_flush().await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("Favorite sync failed, keeping queue: {}", e);
                SyncOutcome::Failed(e.to_string())
            }
        }
    }

    async fn try_flush(&self) -> Result<SyncOutcome> {
        let favorites = self.queue.load()?;
        if favorites.is_empty() {
            log::debug!("Favorite sync: queue empty");
            return Ok(SyncOutcome::Empty);
        }

        let request = Request::from_url(Method::Post, self.endpoint.clone())
            .json(&SyncBody {
                favorites: &favorites,
            })?;
        let response = self.fetcher.fetch(&request).await?;
        if !response.is_success() {
            return Err(NetworkError::Http(response.status(), response.text()).into());
        }

        self.queue.acknowledge(&favorites)?;
        log::info!("Synced {} offline favorites", favorites.len());
        Ok(SyncOutcome::Flushed(favorites.len()))
    }

    /// Flush with bounded exponential backoff between failed attempts
    pub async fn flush_with_retry(&self) -> SyncOutcome {
        let mut attempt = 1;
        loop {
            let outcome = self.flush().await;
            if !outcome.is_failure() || attempt >= self.policy.max_attempts {
                if outcome.is_failure() {
                    log::warn!(
                        "Giving up favorite sync after {} attempts; queue kept",
                        attempt
                    );
                }
                return outcome;
            }

            let delay = self.policy.delay_for(attempt);
            log::debug!("Retrying favorite sync in {:?}", delay);
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{MemoryFetcher, Response};
    use crate::storage::LocalStorage;

    const ENDPOINT: &str = "https://shop.example/api/favorites/sync";

    fn setup(policy: RetryPolicy) -> (MemoryFetcher, FavoriteSync) {
        let fetcher = MemoryFetcher::new();
        let queue = FavoriteQueue::new(LocalStorage::new(), "offlineFavorites");
        let sync = FavoriteSync::new(
            Arc::new(fetcher.clone()),
            queue,
            Url::parse(ENDPOINT).unwrap(),
            policy,
        );
        (fetcher, sync)
    }

    #[tokio::test]
    async fn test_empty_queue_sends_nothing() {
        let (fetcher, sync) = setup(RetryPolicy::immediate(1));
        assert_eq!(sync.flush().await, SyncOutcome::Empty);
        assert_eq!(fetcher.request_count(), 0);
    }

    #[tokio::test]
    async fn test_success_clears_queue() {
        let (fetcher, sync) = setup(RetryPolicy::immediate(1));
        fetcher.route(Method::Post, ENDPOINT, Response::new(200, "{}"));
        sync.queue().push("camry").unwrap();
        sync.queue().push("hilux").unwrap();

        assert_eq!(sync.flush().await, SyncOutcome::Flushed(2));
        assert!(sync.queue().is_empty());

        let sent = fetcher.requests();
        assert_eq!(sent[0].method, Method::Post);
        let body: serde_json::Value = serde_json::from_slice(sent[0].body.as_ref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"favorites": ["camry", "hilux"]}));
    }

    #[tokio::test]
    async fn test_server_error_keeps_queue() {
        let (fetcher, sync) = setup(RetryPolicy::immediate(1));
        fetcher.route(Method::Post, ENDPOINT, Response::new(500, "down"));
        sync.queue().push("camry").unwrap();

        assert!(sync.flush().await.is_failure());
        assert_eq!(sync.queue().load().unwrap(), vec!["camry"]);
    }

    #[tokio::test]
    async fn test_offline_keeps_queue() {
        let (fetcher, sync) = setup(RetryPolicy::immediate(1));
        fetcher.set_offline(true);
        sync.queue().push("camry").unwrap();

        assert!(sync.flush().await.is_failure());
        assert_eq!(sync.queue().len(), 1);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let (fetcher, sync) = setup(RetryPolicy::immediate(3));
        fetcher.set_offline(true);
        sync.queue().push("camry").unwrap();

        assert!(sync.flush_with_retry().await.is_failure());
        assert_eq!(fetcher.request_count(), 3);
        assert_eq!(sync.queue().len(), 1);
    }

    #[tokio::test]
    async fn test_retry_stops_on_success() {
        let (fetcher, sync) = setup(RetryPolicy::immediate(5));
        fetcher.route(Method::Post, ENDPOINT, Response::new(204, ""));
        sync.queue().push("camry").unwrap();

        assert_eq!(sync.flush_with_retry().await, SyncOutcome::Flushed(1));
        assert_eq!(fetcher.request_count(), 1);
    }
}
