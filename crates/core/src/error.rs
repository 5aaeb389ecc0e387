//! Error types for bunnystorage

use crate::object::ResponseMeta;
use bytes::Bytes;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bunnystorage
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for bunnystorage
#[derive(Error, Debug)]
pub enum Error {
    /// No user agent was set and none could be defaulted
    #[error("user agent required")]
    UserAgentRequired,

    /// Config has no storage zone name
    #[error("storage zone required")]
    StorageZoneRequired,

    /// Config has no storage zone key
    #[error("storage zone key required")]
    KeyRequired,

    /// Config has no endpoint
    #[error("endpoint required")]
    EndpointRequired,

    /// Endpoint is set but is not a known region
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidConfig(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// Timeout, with the request it happened on
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,

    /// The service answered but the payload could not be decoded
    #[error("failed to decode response from {}: {source}", .meta.url)]
    Decode {
        #[source]
        source: serde_json::Error,
        meta: Box<ResponseMeta>,
        body: Bytes,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Response metadata, when the failure happened after a response arrived.
    pub fn response_meta(&self) -> Option<&ResponseMeta> {
        match self {
            Error::Decode { meta, .. } => Some(meta.as_ref()),
            _ => None,
        }
    }

    /// True for errors raised while checking a [`Config`](crate::Config).
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::UserAgentRequired
                | Error::StorageZoneRequired
                | Error::KeyRequired
                | Error::EndpointRequired
                | Error::InvalidEndpoint(_)
                | Error::ConfigNotFound(_)
                | Error::InvalidConfig(_)
        )
    }

    /// Wraps a reqwest failure with the method and URL it happened on.
    pub(crate) fn transport(err: reqwest::Error, method: &reqwest::Method, url: &reqwest::Url) -> Self {
        Error::from(err).with_request(method, url)
    }

    /// Prefixes transport errors with `METHOD url`; other variants pass through.
    pub(crate) fn with_request(self, method: &reqwest::Method, url: &reqwest::Url) -> Self {
        match self {
            Error::Network(msg) => Error::Network(format!("{} {}: {}", method, url, msg)),
            Error::HttpClient(msg) => Error::HttpClient(format!("{} {}: {}", method, url, msg)),
            Error::Timeout(msg) => Error::Timeout(format!("{} {}: {}", method, url, msg)),
            other => other,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(err.to_string())
        } else if err.is_connect() {
            Error::Network(err.to_string())
        } else if err.is_request() || err.is_builder() {
            Error::HttpClient(err.to_string())
        } else {
            Error::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_distinct() {
        let errors = [
            Error::UserAgentRequired,
            Error::StorageZoneRequired,
            Error::KeyRequired,
            Error::EndpointRequired,
            Error::InvalidEndpoint("mars".to_string()),
        ];

        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        for (i, a) in messages.iter().enumerate() {
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(errors.iter().all(Error::is_config));
    }

    #[test]
    fn test_transport_errors_are_not_config() {
        assert!(!Error::Timeout("slow".to_string()).is_config());
        assert!(!Error::Cancelled.is_config());
        assert!(!Error::Network("reset".to_string()).is_config());
        assert!(Error::Cancelled.response_meta().is_none());
    }

    #[test]
    fn test_timeout_names_the_request() {
        let url = reqwest::Url::parse("https://storage.bunnycdn.com/zone/dir/file.txt").unwrap();
        let err = Error::Timeout("deadline elapsed".to_string()).with_request(&reqwest::Method::PUT, &url);

        let message = err.to_string();
        assert!(message.starts_with("Operation timed out: PUT https://storage.bunnycdn.com/zone/dir/file.txt"));
        assert!(message.ends_with("deadline elapsed"));
    }

    #[test]
    fn test_with_request_leaves_other_errors_alone() {
        let url = reqwest::Url::parse("https://storage.bunnycdn.com/zone/").unwrap();
        let err = Error::Cancelled.with_request(&reqwest::Method::GET, &url);
        assert!(matches!(err, Error::Cancelled));
    }
}
