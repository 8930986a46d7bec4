//! HTTP request types

use crate::utils::{Result, error::NetworkError};
use serde::Serialize;
use std::collections::HashMap;
use url::Url;

/// HTTP methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
        }
    }
}

/// HTTP request
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HashMap<String, String>,
    body: Option<Vec<u8>>,
}

impl Request {
    /// Create a new request for an absolute http(s) URL
    pub fn new(method: Method, url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|_| NetworkError::InvalidUrl(url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(NetworkError::InvalidUrl(url.to_string()).into());
        }
        Ok(Self::from_url(method, parsed))
    }

    /// Create a request from an already parsed URL
    pub fn from_url(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Create a GET request
    pub fn get(url: &str) -> Result<Self> {
        Self::new(Method::Get, url)
    }

    /// Create a POST request
    pub fn post(url: &str) -> Result<Self> {
        Self::new(Method::Post, url)
    }

    /// Add a header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Set the request body
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Set a JSON body and content type
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value)?;
        Ok(self.header("content-type", "application/json").body(body))
    }

    /// Get the URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get the method
    pub fn method(&self) -> Method {
        self.method
    }

    /// Get headers
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Get the body, if any
    pub fn body_bytes(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
}
