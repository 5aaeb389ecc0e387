//! Configuration management for bunnystorage

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::Deref;
use std::path::Path;
use std::time::Duration;

/// Default number of retries after a rate-limited response
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default per-attempt request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default sustained request rate
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 50;

/// Default burst capacity of the request bucket
pub const DEFAULT_BURST: u32 = 100;

/// User agent sent when the caller does not set one
pub const DEFAULT_USER_AGENT: &str = concat!(
    env!("CARGO_PKG_NAME"),
    "/",
    env!("CARGO_PKG_VERSION"),
    " ",
    env!("CARGO_PKG_REPOSITORY")
);

/// Which credential a request needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

/// Client-side request admission settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Tokens added per second
    pub per_second: u32,
    /// Bucket capacity
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: DEFAULT_REQUESTS_PER_SECOND,
            burst: DEFAULT_BURST,
        }
    }
}

/// Settings for a [`StorageClient`](crate::StorageClient)
///
/// Zero values mean "use the default" for `max_retries`, `timeout` and the
/// rate limit. Defaults are applied by [`Config::into_validated`].
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Sent as the `User-Agent` header
    pub user_agent: String,

    /// Name of the storage zone to connect to
    pub storage_zone: String,

    /// Storage zone password, used for reads and writes
    pub key: String,

    /// Optional read-only password, preferred for reads when set
    pub read_only_key: Option<String>,

    /// Region to talk to
    pub endpoint: Endpoint,

    /// Replaces the region's base URL, e.g. for a proxy. `endpoint` must
    /// still be a valid region.
    pub base_url: Option<Url>,

    /// Retries after a rate-limited response
    pub max_retries: u32,

    /// Deadline for each attempt of a request
    pub timeout: Duration,

    pub rate_limit: RateLimitConfig,

    /// Trace every request and response through `tracing`
    pub debug: bool,
}

impl Config {
    /// Create a config with the required fields set.
    pub fn new(storage_zone: impl Into<String>, key: impl Into<String>, endpoint: Endpoint) -> Self {
        Self {
            storage_zone: storage_zone.into(),
            key: key.into(),
            endpoint,
            ..Self::default()
        }
    }

    /// The key to send for `op`.
    pub fn access_key(&self, op: Operation) -> &str {
        if op == Operation::Read {
            if let Some(key) = self.read_only_key.as_deref().filter(|k| !k.is_empty()) {
                return key;
            }
        }

        &self.key
    }

    /// Fill unset optional fields with their defaults. Calling it again is a no-op.
    pub fn apply_defaults(&mut self) {
        if self.user_agent.is_empty() {
            self.user_agent = DEFAULT_USER_AGENT.to_string();
        }

        if self.max_retries < 1 {
            self.max_retries = DEFAULT_MAX_RETRIES;
        }

        if self.timeout.is_zero() {
            self.timeout = DEFAULT_TIMEOUT;
        }

        if self.rate_limit.per_second == 0 {
            self.rate_limit.per_second = DEFAULT_REQUESTS_PER_SECOND;
        }

        if self.rate_limit.burst == 0 {
            self.rate_limit.burst = DEFAULT_BURST;
        }
    }

    /// Check required fields, reporting the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.user_agent.is_empty() {
            return Err(Error::UserAgentRequired);
        }

        if self.storage_zone.is_empty() {
            return Err(Error::StorageZoneRequired);
        }

        if self.key.is_empty() {
            return Err(Error::KeyRequired);
        }

        if !self.endpoint.is_valid() {
            return Err(Error::EndpointRequired);
        }

        Ok(())
    }

    /// Apply defaults, validate, and freeze the config.
    pub fn into_validated(mut self) -> Result<ValidatedConfig> {
        self.apply_defaults();
        self.validate()?;
        Ok(ValidatedConfig(self))
    }

    /// Base URL requests are built on.
    pub fn base_url(&self) -> Result<Url> {
        match &self.base_url {
            Some(url) => Ok(url.clone()),
            None => self.endpoint.url(),
        }
    }
}

/// A [`Config`] that has been defaulted and validated; read-only from here on.
#[derive(Debug, Clone)]
pub struct ValidatedConfig(Config);

impl Deref for ValidatedConfig {
    type Target = Config;

    fn deref(&self) -> &Config {
        &self.0
    }
}

/// On-disk configuration format (TOML)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub storage_zone: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only_key: Option<String>,
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Per-attempt timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub debug: bool,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl ConfigFile {
    /// Convert to a [`Config`], parsing the endpoint strictly.
    pub fn into_config(self) -> Result<Config> {
        let endpoint: Endpoint = self.endpoint.parse()?;

        Ok(Config {
            user_agent: self.user_agent.unwrap_or_default(),
            storage_zone: self.storage_zone,
            key: self.key,
            read_only_key: self.read_only_key,
            endpoint,
            base_url: None,
            max_retries: self.max_retries,
            timeout: Duration::from_secs(self.timeout),
            rate_limit: RateLimitConfig::default(),
            debug: self.debug,
        })
    }
}

/// Load a configuration file from an explicit path
pub fn load_config(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(Error::ConfigNotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|e| {
        Error::InvalidConfig(format!("Failed to read config file: {}", e))
    })?;

    let config: ConfigFile = toml::from_str(&content).map_err(|e| {
        Error::InvalidConfig(format!("Failed to parse config file: {}", e))
    })?;

    Ok(config)
}
