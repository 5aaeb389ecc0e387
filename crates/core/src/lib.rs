//! bunnystorage - Client library for bunny.net Edge Storage
//!
//! This library lists, uploads, downloads and deletes files in a storage
//! zone. Every request goes through a shared transport that throttles
//! outgoing calls and retries rate-limited responses.

pub mod checksum;
pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod object;
pub mod transport;

// Re-export commonly used types
pub use checksum::{compute_sha256, compute_sha256_file};
pub use client::StorageClient;
pub use config::{load_config, Config, ConfigFile, Operation, RateLimitConfig, ValidatedConfig};
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use object::{Object, ResponseMeta, StorageResponse};
pub use tokio_util::sync::CancellationToken;
