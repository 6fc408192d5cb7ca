//! Configuration types for the CouchDB storage backend.

use serde::{Deserialize, Serialize};

/// Configuration for the CouchDB storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CouchConfig {
    /// Server URL: `http://host:port`
    pub url: String,

    /// Basic auth user name.
    pub username: Option<String>,

    /// Basic auth password.
    pub password: Option<String>,

    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,

    /// Rows fetched per cursor page.
    pub page_size: usize,
}

impl Default for CouchConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5984".into(),
            username: None,
            password: None,
            request_timeout_ms: 30_000,
            page_size: 500,
        }
    }
}

impl CouchConfig {
    /// Creates a new configuration with the given server URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets basic auth credentials.
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_request_timeout_ms(mut self, timeout: u64) -> Self {
        self.request_timeout_ms = timeout;
        self
    }

    /// Sets the cursor page size. Zero is raised to one.
    #[must_use]
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CouchConfig::default();
        assert_eq!(config.url, "http://localhost:5984");
        assert!(config.username.is_none());
        assert_eq!(config.request_timeout_ms, 30_000);
        assert_eq!(config.page_size, 500);
    }

    #[test]
    fn test_config_builder() {
        let config = CouchConfig::new("http://couch:5984")
            .with_credentials("admin", "secret")
            .with_request_timeout_ms(1_000)
            .with_page_size(0);

        assert_eq!(config.url, "http://couch:5984");
        assert_eq!(config.username.as_deref(), Some("admin"));
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.request_timeout_ms, 1_000);
        assert_eq!(config.page_size, 1);
    }

    #[test]
    fn test_partial_deserialization() {
        let config: CouchConfig =
            serde_json::from_str(r#"{"url": "http://db:5984", "page_size": 50}"#)
                .expect("deserialization failed");
        assert_eq!(config.url, "http://db:5984");
        assert_eq!(config.page_size, 50);
        assert_eq!(config.request_timeout_ms, 30_000);
    }
}
