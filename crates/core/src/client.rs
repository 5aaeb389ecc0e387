//! Edge Storage client

use crate::config::{Config, Operation, ValidatedConfig};
use crate::error::{Error, Result};
use crate::object::{Object, StorageResponse};
use crate::transport::Transport;
use bytes::Bytes;
use reqwest::header::ACCEPT;
use reqwest::Url;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Header carrying the storage zone password
pub const ACCESS_KEY_HEADER: &str = "AccessKey";

/// Header carrying the upload's content digest
pub const CHECKSUM_HEADER: &str = "Checksum";

/// Client for one storage zone
///
/// Cheap to clone; clones share the same rate limiter and connection pool.
#[derive(Clone)]
pub struct StorageClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Transport,
    config: ValidatedConfig,
    base_url: Url,
}

impl StorageClient {
    /// Create a new client, applying defaults and validating `config`
    pub fn new(config: Config) -> Result<Self> {
        let config = config.into_validated()?;
        let base_url = config.base_url()?;
        let transport = Transport::new(&config)?;

        tracing::debug!(
            storage_zone = %config.storage_zone,
            base_url = %base_url,
            max_retries = config.max_retries,
            timeout_secs = config.timeout.as_secs(),
            "storage client created"
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                transport,
                config,
                base_url,
            }),
        })
    }

    /// The config this client runs with, after defaults were applied
    pub fn config(&self) -> &ValidatedConfig {
        &self.inner.config
    }

    /// List the entries under `path`
    ///
    /// `path` may not contain `..` components.
    pub async fn list(&self, cancel: &CancellationToken, path: &str) -> Result<StorageResponse<Vec<Object>>> {
        let url = self.object_url(path, None)?;
        let key = self.inner.config.access_key(Operation::Read).to_string();

        let (meta, body) = self
            .inner
            .transport
            .execute(cancel, |http| {
                http.get(url.clone())
                    .header(ACCEPT, "application/json")
                    .header(ACCESS_KEY_HEADER, key.as_str())
            })
            .await?;

        match serde_json::from_slice::<Vec<Object>>(&body) {
            Ok(objects) => Ok(StorageResponse { meta, data: objects }),
            Err(source) => Err(Error::Decode {
                source,
                meta: Box::new(meta),
                body,
            }),
        }
    }

    /// Download `filename` from `path`
    ///
    /// Only the base name of `filename` is used. A missing file is not an
    /// error here; check the returned status.
    pub async fn download(
        &self,
        cancel: &CancellationToken,
        path: &str,
        filename: &str,
    ) -> Result<StorageResponse<Bytes>> {
        let url = self.object_url(path, Some(base_name(filename)?))?;
        let key = self.inner.config.access_key(Operation::Read).to_string();

        let (meta, body) = self
            .inner
            .transport
            .execute(cancel, |http| {
                http.get(url.clone())
                    .header(ACCEPT, "*/*")
                    .header(ACCESS_KEY_HEADER, key.as_str())
            })
            .await?;

        Ok(StorageResponse { meta, data: body })
    }

    /// Upload `body` as `path/filename`
    ///
    /// `filename` may contain `/` to place the file in a sub-directory, but
    /// no `.` or `..` components and no trailing `/`. A non-empty `checksum`
    /// is sent upper-cased for the service to verify.
    ///
    /// The body is taken as [`Bytes`] and held in memory for the whole call,
    /// so that an attempt answered with 429 can be sent again unchanged.
    /// Streaming sources must be collected first.
    pub async fn upload(
        &self,
        cancel: &CancellationToken,
        path: &str,
        filename: &str,
        checksum: &str,
        body: impl Into<Bytes>,
    ) -> Result<StorageResponse<()>> {
        let url = self.object_url(path, Some(upload_name(filename)?))?;
        let key = self.inner.config.access_key(Operation::Write).to_string();
        let checksum = checksum.trim().to_uppercase();
        let body = body.into();

        let (meta, _) = self
            .inner
            .transport
            .execute(cancel, |http| {
                let request = http
                    .put(url.clone())
                    .header(ACCESS_KEY_HEADER, key.as_str())
                    .body(body.clone());

                if checksum.is_empty() {
                    request
                } else {
                    request.header(CHECKSUM_HEADER, checksum.as_str())
                }
            })
            .await?;

        Ok(StorageResponse { meta, data: () })
    }

    /// Upload a local file, read fully into memory first
    pub async fn upload_file(
        &self,
        cancel: &CancellationToken,
        path: &str,
        filename: &str,
        checksum: &str,
        local: &Path,
    ) -> Result<StorageResponse<()>> {
        let contents = tokio::fs::read(local).await?;
        self.upload(cancel, path, filename, checksum, contents).await
    }

    /// Delete `filename` from `path`
    ///
    /// Only the base name of `filename` is used.
    pub async fn delete(
        &self,
        cancel: &CancellationToken,
        path: &str,
        filename: &str,
    ) -> Result<StorageResponse<()>> {
        let url = self.object_url(path, Some(base_name(filename)?))?;
        let key = self.inner.config.access_key(Operation::Write).to_string();

        let (meta, _) = self
            .inner
            .transport
            .execute(cancel, |http| {
                http.delete(url.clone()).header(ACCESS_KEY_HEADER, key.as_str())
            })
            .await?;

        Ok(StorageResponse { meta, data: () })
    }

    /// `{base}/{zone}/{path}/` or `{base}/{zone}/{path}/{filename}`
    fn object_url(&self, path: &str, filename: Option<&str>) -> Result<Url> {
        build_url(&self.inner.base_url, &self.inner.config.storage_zone, path, filename)
    }
}

pub(crate) fn build_url(base: &Url, zone: &str, path: &str, filename: Option<&str>) -> Result<Url> {
    let dirs = path_segments(path)?;
    let names = filename.map(path_segments).transpose()?;
    let mut url = base.clone();

    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| Error::InvalidInput(format!("base URL cannot carry a path: {}", base)))?;

        segments.pop_if_empty().push(zone).extend(dirs);

        match names {
            Some(names) => {
                segments.extend(names);
            }
            None => {
                segments.push("");
            }
        }
    }

    Ok(url)
}

/// Components of a `/`-separated path. Empty and `.` components are skipped;
/// `..` is refused because the URL parser would silently resolve it.
fn path_segments(path: &str) -> Result<Vec<&str>> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(Error::InvalidInput(format!("path may not contain '..': {:?}", path))),
            s => segments.push(s),
        }
    }
    Ok(segments)
}

/// Upload target relative to the directory; sub-directories are kept.
pub(crate) fn upload_name(filename: &str) -> Result<&str> {
    let last = filename.rsplit('/').next().unwrap_or_default();
    let dotted = filename.split('/').any(|s| s == "." || s == "..");

    if last.is_empty() || dotted {
        return Err(Error::InvalidInput(format!("not a file name: {:?}", filename)));
    }
    Ok(filename)
}

/// Last path component of `filename`; directory parts are dropped.
pub(crate) fn base_name(filename: &str) -> Result<&str> {
    match filename.rsplit('/').find(|s| !s.is_empty()) {
        Some(name) if name != "." && name != ".." => Ok(name),
        _ => Err(Error::InvalidInput(format!("not a file name: {:?}", filename))),
    }
}
