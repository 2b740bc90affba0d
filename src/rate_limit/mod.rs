// Rate-limit-aware HTTP client for outbound provider calls.
//
// A 429 response is retried up to `max_retries` more times. The delay honours a
// numeric Retry-After header, otherwise doubles from `base_delay_ms`, plus 0-100ms of
// jitter. Every other failure is returned on the first attempt. No state is shared
// between calls, so concurrent callers each run their own retry loop.

use rand::Rng;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};


/// Upper bound of the random jitter added to every retry delay.
const MAX_JITTER_MS: u64 = 100;

/// Retry policy and transport timeout.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimiterConfig {
    /// Additional attempts after a 429 (total attempts = max_retries + 1)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// First exponential backoff step (milliseconds)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Per-attempt transport timeout, independent of retry delays
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_seconds() -> u64 {
    20
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl RateLimiterConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Headers, query parameters and body for one request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    bearer_token: Option<String>,
    body: Option<RequestBody>,
}

#[derive(Debug, Clone)]
enum RequestBody {
    Json(Value),
    Form(Vec<(String, String)>),
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    pub fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn form<K: Into<String>, V: Into<String>>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self {
        let fields = fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self.body = Some(RequestBody::Form(fields));
        self
    }
}

/// Buffered successful response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl HttpResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_json::from_str(&self.body).map_err(HttpError::Decode)
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    /// Non-2xx response. `body` is kept for logs only and must not reach end users.
    #[error("request failed with status {status}")]
    Status {
        status: StatusCode,
        retry_after: Option<u64>,
        body: String,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[source] serde_json::Error),
}

impl HttpError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            HttpError::Transport(e) => e.status(),
            HttpError::Decode(_) => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(StatusCode::TOO_MANY_REQUESTS)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

/// Outbound HTTP client with 429 retry handling.
pub struct RateLimiter {
    client: Client,
    config: RateLimiterConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Result<Self, HttpError> {
        let client = Client::builder()
            .user_agent(concat!("storefront/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Sends a request, retrying rate-limited responses.
    ///
    /// # Returns
    /// * `Ok(HttpResponse)` - 2xx response with the body buffered
    /// * `Err(HttpError::Status)` - Non-2xx (a 429 only after retries are exhausted)
    /// * `Err(HttpError::Transport)` - Connection failure or timeout, never retried
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
    ) -> Result<HttpResponse, HttpError> {
        let mut attempt: u32 = 0;

        loop {
            match self.send_once(method.clone(), url, options).await {
                Err(HttpError::Status {
                    status: StatusCode::TOO_MANY_REQUESTS,
                    retry_after,
                    ..
                }) if attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = backoff_delay(self.config.base_delay(), attempt, retry_after) + jitter();
                    warn!(
                        url = %url,
                        attempt,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limit hit, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }

    pub async fn get(&self, url: &str, options: &RequestOptions) -> Result<HttpResponse, HttpError> {
        self.request(Method::GET, url, options).await
    }

    pub async fn post(&self, url: &str, options: &RequestOptions) -> Result<HttpResponse, HttpError> {
        self.request(Method::POST, url, options).await
    }

    pub async fn put(&self, url: &str, options: &RequestOptions) -> Result<HttpResponse, HttpError> {
        self.request(Method::PUT, url, options).await
    }

    pub async fn delete(&self, url: &str, options: &RequestOptions) -> Result<HttpResponse, HttpError> {
        self.request(Method::DELETE, url, options).await
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
    ) -> Result<HttpResponse, HttpError> {
        let mut builder = self.client.request(method.clone(), url);

        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        for (name, value) in &options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = &options.bearer_token {
            builder = builder.bearer_auth(token);
        }
        builder = match &options.body {
            Some(RequestBody::Json(body)) => builder.json(body),
            Some(RequestBody::Form(fields)) => builder.form(fields),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        debug!(method = %method, url = %url, status = status.as_u16(), "Provider response");

        if !status.is_success() {
            return Err(HttpError::Status {
                status,
                retry_after: parse_retry_after(&headers),
                body,
            });
        }

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Whole seconds from a `Retry-After` header; HTTP-date values are ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
}

/// Delay before retry number `attempt` (1-indexed), without jitter.
fn backoff_delay(base_delay: Duration, attempt: u32, retry_after: Option<u64>) -> Duration {
    match retry_after {
        Some(seconds) => Duration::from_secs(seconds),
        None => {
            let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
            base_delay.saturating_mul(factor)
        }
    }
}

fn jitter() -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(0..=MAX_JITTER_MS))
}
