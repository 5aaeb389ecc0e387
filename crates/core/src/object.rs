//! Listing entries and response metadata

use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A file or directory entry returned by a listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Object {
    pub guid: String,
    pub storage_zone_name: String,
    pub path: String,
    pub object_name: String,
    pub length: i64,
    pub last_changed: String,
    pub server_id: i64,
    pub array_number: i64,
    pub is_directory: bool,
    pub user_id: String,
    pub content_type: String,
    pub date_created: String,
    pub storage_zone_id: i64,
    pub checksum: Option<String>,
    pub replicated_zones: Option<String>,
}

/// What the transport saw for the final attempt of a request
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Time spent on the final attempt
    pub elapsed: Duration,
    /// Number of attempts made, including the first
    pub attempts: u32,
}

impl ResponseMeta {
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Decoded payload together with the response it came from
///
/// A non-2xx status is not an error at this level; check `meta.status`.
#[derive(Debug, Clone)]
pub struct StorageResponse<T> {
    pub meta: ResponseMeta,
    pub data: T,
}

impl<T> StorageResponse<T> {
    pub fn status_code(&self) -> u16 {
        self.meta.status_code()
    }

    pub fn into_data(self) -> T {
        self.data
    }
}
