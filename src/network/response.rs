//! HTTP response types

use std::collections::HashMap;

/// HTTP response
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: u16,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl Response {
    /// Create a new response
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Create a new response with headers
    pub fn with_headers(
        status: u16,
        body: impl Into<Vec<u8>>,
        headers: HashMap<String, String>,
    ) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Get the status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Check if the response was successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get the response body
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body decoded as UTF-8, lossily
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Get the content type from headers
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Get a specific header
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    /// Add a header
    pub fn add_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(key.into().to_ascii_lowercase(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classes() {
        assert!(Response::new(204, "").is_success());
        assert!(!Response::new(304, "").is_success());
        assert!(!Response::new(503, "").is_success());
    }

    #[test]
    fn test_headers_case_insensitive() {
        let mut response = Response::new(200, "body { }");
        response.add_header("Content-Type", "text/css");
        assert_eq!(response.content_type(), Some("text/css"));
        assert_eq!(response.header("CONTENT-TYPE"), Some("text/css"));
        assert_eq!(response.text(), "body { }");
    }
}
