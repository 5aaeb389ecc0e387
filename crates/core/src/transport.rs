//! Request execution: client-side rate limiting and retry on 429

use crate::config::ValidatedConfig;
use crate::error::{Error, Result};
use crate::object::ResponseMeta;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Request, RequestBuilder, StatusCode, Url};
use std::num::NonZeroU32;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// First wait when a 429 carries no usable `Retry-After`
const FALLBACK_RETRY_WAIT: Duration = Duration::from_millis(100);

/// Upper bound for the fallback wait
const FALLBACK_RETRY_MAX_WAIT: Duration = Duration::from_secs(2);

/// Shared HTTP machinery behind every [`StorageClient`](crate::StorageClient) call
pub struct Transport {
    http: Client,
    limiter: DefaultDirectRateLimiter,
    max_retries: u32,
    timeout: Duration,
    debug: bool,
}

struct RawResponse {
    url: Url,
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Transport {
    /// Build the transport for a validated config
    pub fn new(config: &ValidatedConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .connection_verbose(config.debug)
            .build()
            .map_err(|e| Error::HttpClient(format!("Failed to build HTTP client: {}", e)))?;

        let per_second = NonZeroU32::new(config.rate_limit.per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.rate_limit.burst).unwrap_or(NonZeroU32::MIN);
        let limiter = RateLimiter::direct(Quota::per_second(per_second).allow_burst(burst));

        Ok(Self {
            http,
            limiter,
            max_retries: config.max_retries,
            timeout: config.timeout,
            debug: config.debug,
        })
    }

    /// Wait for a rate-limit token, for at most the request timeout.
    pub async fn admit(&self, cancel: &CancellationToken) -> Result<()> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            ready = tokio::time::timeout(self.timeout, self.limiter.until_ready()) => ready.map_err(|_| {
                Error::Timeout(format!("no rate limit token within {:?}", self.timeout))
            }),
        }
    }

    /// Run one logical request.
    ///
    /// `build` is called once per attempt. A 429 response is retried after the
    /// advertised delay up to `max_retries` times; once retries run out, or
    /// the delay is longer than the request timeout, the last 429 is returned
    /// like any other response.
    pub async fn execute<F>(&self, cancel: &CancellationToken, build: F) -> Result<(ResponseMeta, Bytes)>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let request = build(&self.http).build()?;
            let method = request.method().clone();
            let url = request.url().clone();

            self.admit(cancel).await.map_err(|e| e.with_request(&method, &url))?;

            let started = Instant::now();
            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                result = self.send(request) => result,
            };
            let elapsed = started.elapsed();

            let raw = match sent {
                Ok(raw) => raw,
                Err(e) => {
                    if self.debug {
                        debug!(%method, %url, attempt, elapsed_ms = elapsed.as_millis() as u64, error = %e, "request failed");
                    }
                    return Err(Error::transport(e, &method, &url));
                }
            };

            if self.debug {
                debug!(
                    %method,
                    url = %raw.url,
                    status = raw.status.as_u16(),
                    attempt,
                    elapsed_ms = elapsed.as_millis() as u64,
                    body_len = raw.body.len(),
                    "request completed"
                );
            }

            let delay = match raw.status {
                StatusCode::TOO_MANY_REQUESTS if attempt <= self.max_retries => {
                    Some(retry_after(&raw.headers, Utc::now()).unwrap_or_else(|| fallback_wait(attempt)))
                }
                _ => None,
            };

            if let Some(delay) = delay.filter(|delay| *delay > self.timeout) {
                warn!(
                    %method,
                    url = %raw.url,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "rate limited, retry delay exceeds timeout"
                );
            } else if let Some(delay) = delay {
                warn!(
                    %method,
                    url = %raw.url,
                    attempt,
                    max_retries = self.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "rate limited, retrying"
                );

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
                continue;
            }

            let meta = ResponseMeta {
                url: raw.url,
                status: raw.status,
                headers: raw.headers,
                elapsed,
                attempts: attempt,
            };

            return Ok((meta, raw.body));
        }
    }

    async fn send(&self, request: Request) -> reqwest::Result<RawResponse> {
        let response = self.http.execute(request).await?;
        let url = response.url().clone();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(RawResponse {
            url,
            status,
            headers,
            body,
        })
    }
}

/// Delay advertised by a `Retry-After` header, as delta-seconds or an HTTP date.
fn retry_after(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

fn fallback_wait(attempt: u32) -> Duration {
    let factor = 1u32 << attempt.saturating_sub(1).min(10);
    (FALLBACK_RETRY_WAIT * factor).min(FALLBACK_RETRY_MAX_WAIT)
}
