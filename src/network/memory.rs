//! In-memory network for tests and offline demos

use super::{Fetcher, Method, Request, Response};
use crate::utils::{Result, error::NetworkError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// A request as seen by [`MemoryFetcher`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Vec<u8>>,
}

/// Fetcher answering from a fixed route table. Unknown URLs get a 404;
/// while offline every request fails with a connection error.
#[derive(Debug, Default, Clone)]
pub struct MemoryFetcher {
    routes: Arc<Mutex<HashMap<(String, String), Response>>>,
    log: Arc<Mutex<Vec<RecordedRequest>>>,
    offline: Arc<AtomicBool>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method url` with `response`
    pub fn route(&self, method: Method, url: &str, response: Response) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.insert((method.as_str().to_string(), url.to_string()), response);
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Requests seen so far, including failed ones
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.log.lock().map(|l| l.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        if let Ok(mut log) = self.log.lock() {
            log.push(RecordedRequest {
                method: request.method(),
                url: request.url().to_string(),
                body: request.body_bytes().map(<[u8]>::to_vec),
            });
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::ConnectionFailed("offline".into()).into());
        }

        let key = (
            request.method().as_str().to_string(),
            request.url().to_string(),
        );
        let response = self
            .routes
            .lock()
            .ok()
            .and_then(|routes| routes.get(&key).cloned())
            .unwrap_or_else(|| Response::new(404, "Not Found"));
        Ok(response)
    }
}
