//! Network access for the offline layer
//!
//! The service worker never talks to reqwest directly; it goes through the
//! [`Fetcher`] trait so the network can be swapped for an in-memory one.

mod client;
mod memory;
mod request;
mod response;

pub use client::HttpFetcher;
pub use memory::{MemoryFetcher, RecordedRequest};
pub use request::{Method, Request};
pub use response::Response;

use crate::utils::Result;
use async_trait::async_trait;

/// Something that can turn a request into a response
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform the request. Non-2xx statuses are returned as responses;
    /// only transport failures are errors.
    async fn fetch(&self, request: &Request) -> Result<Response>;
}
