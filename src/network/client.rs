//! HTTP client implementation

use super::{Fetcher, Method, Request, Response};
use crate::utils::{Result, error::NetworkError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Network fetcher backed by reqwest
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with the given request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("Showroom/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;

        Ok(Self { client })
    }
}

fn map_error(err: reqwest::Error) -> NetworkError {
    if err.is_timeout() {
        NetworkError::Timeout
    } else {
        NetworkError::ConnectionFailed(err.to_string())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        let method = match request.method() {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
            Method::Head => reqwest::Method::HEAD,
        };

        let mut req = self.client.request(method, request.url().clone());
        for (name, value) in request.headers() {
            req = req.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body_bytes() {
            req = req.body(body.to_vec());
        }

        let response = req.send().await.map_err(map_error)?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();
        let body = response.bytes().await.map_err(map_error)?;

        log::debug!("{} {} -> {}", request.method().as_str(), request.url(), status);

        Ok(Response::with_headers(status, body.to_vec(), headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_builds() {
        assert!(HttpFetcher::new(Duration::from_secs(5)).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_connection_error() {
        let fetcher = HttpFetcher::new(Duration::from_millis(500)).unwrap();
        // Port 9 on loopback (discard) is closed on test machines
        let request = Request::get("http://127.0.0.1:9/").unwrap();
        let err = fetcher.fetch(&request).await.unwrap_err();
        assert!(matches!(
            err,
            crate::ShowroomError::Network(
                NetworkError::ConnectionFailed(_) | NetworkError::Timeout
            )
        ));
    }
}
