//! HTTP client wrapper for metadata requests.

use std::time::Duration;

use reqwest::{Client, StatusCode};

use crate::error::MetadataError;

/// Default timeout for metadata requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Default metadata service base URL (link-local address).
pub const DEFAULT_BASE_URL: &str = "http://100.100.100.200";

/// Path prefix of every metadata item.
pub const META_DATA_PATH: &str = "/latest/meta-data/";

/// HTTP client wrapper for metadata service requests.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    inner: Client,
    base_url: String,
}

impl MetadataClient {
    /// Create a new metadata client with the specified timeout and base URL.
    pub fn new(timeout: Duration, base_url: &str) -> Result<Self, MetadataError> {
        let inner = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            inner,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a new metadata client with the default timeout and base URL.
    pub fn with_default_timeout() -> Result<Self, MetadataError> {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_BASE_URL)
    }

    /// Create a new metadata client with a custom base URL (for testing).
    pub fn with_base_url(base_url: &str) -> Result<Self, MetadataError> {
        Self::new(DEFAULT_TIMEOUT, base_url)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of a metadata item.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, META_DATA_PATH, path)
    }

    /// Fetch a metadata item as text.
    ///
    /// `path` is relative to `/latest/meta-data/`, e.g. `region-id` or
    /// `ram/security-credentials/`. Anything other than `200 OK` is an error;
    /// nothing is retried.
    pub async fn fetch(&self, path: &str) -> Result<String, MetadataError> {
        let response = self.inner.get(self.url(path)).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(MetadataError::NotFound);
        }
        if status != StatusCode::OK {
            return Err(MetadataError::Http(status.as_u16()));
        }

        response.text().await.map_err(MetadataError::from)
    }
}
