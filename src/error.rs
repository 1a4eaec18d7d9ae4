//! Error types for metadata and credential operations.

use thiserror::Error;

/// Errors that can occur when talking to the instance metadata service.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The requested metadata was not found.
    #[error("metadata not found")]
    NotFound,

    /// Request timed out.
    #[error("request timeout")]
    Timeout,

    /// HTTP error with status code.
    #[error("http {0}")]
    Http(u16),

    /// No RAM role was given and none could be discovered.
    #[error("ram role name is empty")]
    RoleNameEmpty,

    /// The credential document was served but carries no access key.
    ///
    /// Holds the `Code` field of the document.
    #[error("credential not issued: {0}")]
    Provider(String),

    /// A refresh was requested while the credential cache is disabled.
    #[error("credential cache is disabled")]
    CacheDisabled,

    /// The region lookup returned nothing.
    #[error("instance region is unavailable")]
    RegionUnavailable,

    /// JSON deserialization error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error.
    #[error("request failed: {0}")]
    Request(reqwest::Error),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for MetadataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            MetadataError::Timeout
        } else {
            MetadataError::Request(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::parallel;

    #[test]
    #[parallel]
    fn test_error_display() {
        assert_eq!(MetadataError::NotFound.to_string(), "metadata not found");
        assert_eq!(MetadataError::Timeout.to_string(), "request timeout");
        assert_eq!(MetadataError::Http(500).to_string(), "http 500");
        assert_eq!(
            MetadataError::RoleNameEmpty.to_string(),
            "ram role name is empty"
        );
        assert_eq!(
            MetadataError::Provider("InvalidRole".to_string()).to_string(),
            "credential not issued: InvalidRole"
        );
        assert_eq!(
            MetadataError::CacheDisabled.to_string(),
            "credential cache is disabled"
        );
        assert_eq!(
            MetadataError::RegionUnavailable.to_string(),
            "instance region is unavailable"
        );
    }

    #[test]
    #[parallel]
    fn test_json_error_conversion() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = MetadataError::from(err);
        assert!(matches!(err, MetadataError::Json(_)));
        assert!(err.to_string().starts_with("json: "));
    }
}
