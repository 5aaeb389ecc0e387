//! In-process Edge Storage stand-in for integration tests

#![allow(dead_code)]

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use bunnystorage::{Config, Endpoint};
use reqwest::Url;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub const ZONE: &str = "test-zone";
pub const WRITE_KEY: &str = "write-key";
pub const READ_KEY: &str = "read-key";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Default)]
struct Inner {
    files: HashMap<String, Bytes>,
    requests: Vec<RecordedRequest>,
    throttled: usize,
    retry_after: Option<String>,
    forced_status: Option<StatusCode>,
    delay: Option<Duration>,
}

/// Shared state of the mock server
#[derive(Clone, Default)]
pub struct MockStorage {
    inner: Arc<Mutex<Inner>>,
}

impl MockStorage {
    /// Answer the next `count` requests with 429.
    pub fn throttle(&self, count: usize, retry_after: Option<&str>) {
        let mut inner = self.inner.lock().unwrap();
        inner.throttled = count;
        inner.retry_after = retry_after.map(str::to_string);
    }

    /// Answer every request with `status`.
    pub fn force_status(&self, status: StatusCode) {
        self.inner.lock().unwrap().forced_status = Some(status);
    }

    /// Sleep before answering.
    pub fn delay(&self, delay: Duration) {
        self.inner.lock().unwrap().delay = Some(delay);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.lock().unwrap().requests.clone()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests().pop().expect("no request recorded")
    }

    pub fn hits(&self) -> usize {
        self.inner.lock().unwrap().requests.len()
    }

    pub fn file(&self, path: &str) -> Option<Bytes> {
        self.inner.lock().unwrap().files.get(path).cloned()
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Start the mock server and return its base URL.
pub async fn spawn(storage: MockStorage) -> Url {
    init_tracing();

    let app = Router::new().fallback(handle).with_state(storage);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Url::parse(&format!("http://{}/", addr)).unwrap()
}

/// Config pointing at a running mock server.
pub fn config_for(base_url: Url) -> Config {
    Config {
        read_only_key: Some(READ_KEY.to_string()),
        base_url: Some(base_url),
        ..Config::new(ZONE, WRITE_KEY, Endpoint::Falkenstein)
    }
}

async fn handle(
    State(storage): State<MockStorage>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();

    let delay = {
        let mut inner = storage.inner.lock().unwrap();
        inner.requests.push(RecordedRequest {
            method: method.clone(),
            path: path.clone(),
            headers: headers.clone(),
        });
        inner.delay
    };

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut inner = storage.inner.lock().unwrap();

    if inner.throttled > 0 {
        inner.throttled -= 1;
        let mut response = StatusCode::TOO_MANY_REQUESTS.into_response();
        if let Some(value) = &inner.retry_after {
            response
                .headers_mut()
                .insert("Retry-After", value.parse().unwrap());
        }
        return response;
    }

    if let Some(status) = inner.forced_status {
        return status.into_response();
    }

    let key = headers.get("AccessKey").and_then(|v| v.to_str().ok()).unwrap_or("");
    let allowed = match method {
        Method::GET => key == READ_KEY || key == WRITE_KEY,
        _ => key == WRITE_KEY,
    };
    if !allowed {
        return error_body(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    match method {
        Method::GET if path.ends_with('/') => {
            let entries: Vec<serde_json::Value> = inner
                .files
                .iter()
                .filter_map(|(name, data)| {
                    let rest = name.strip_prefix(&path)?;
                    (!rest.contains('/')).then(|| listing_entry(&path, rest, data.len()))
                })
                .collect();

            if entries.is_empty() && path != format!("/{}/", ZONE) {
                return error_body(StatusCode::NOT_FOUND, "Directory not found");
            }

            axum::Json(entries).into_response()
        }
        Method::GET => match inner.files.get(&path) {
            Some(data) => data.clone().into_response(),
            None => error_body(StatusCode::NOT_FOUND, "Object Not Found"),
        },
        Method::PUT => {
            inner.files.insert(path, body);
            error_body(StatusCode::CREATED, "File uploaded.")
        }
        Method::DELETE => match inner.files.remove(&path) {
            Some(_) => error_body(StatusCode::OK, "File deleted successfuly."),
            None => error_body(StatusCode::NOT_FOUND, "Object Not Found"),
        },
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

fn listing_entry(dir: &str, name: &str, len: usize) -> serde_json::Value {
    serde_json::json!({
        "Guid": format!("{}{}", dir, name),
        "StorageZoneName": ZONE,
        "Path": dir,
        "ObjectName": name,
        "Length": len,
        "LastChanged": "2024-01-02T03:04:05.678",
        "IsDirectory": false,
        "DateCreated": "2024-01-02T03:04:05.678",
        "Checksum": null
    })
}

fn error_body(status: StatusCode, message: &str) -> Response {
    let body = serde_json::json!({ "HttpCode": status.as_u16(), "Message": message });
    (status, axum::Json(body)).into_response()
}
