//! Low-level HTTP client — `UpstreamHttp`.
//!
//! One instance per upstream service (Kamino, MarginFi, Meteora, ...). Every
//! request carries a bounded timeout. Reads are single-attempt unless the
//! client was built with a custom [`RetryPolicy`]; writes always are.

use crate::error::HttpError;
use crate::http::retry::RetryPolicy;
use crate::network::DEFAULT_REQUEST_TIMEOUT;

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// JSON-over-HTTP client for one upstream base URL.
#[derive(Clone)]
pub struct UpstreamHttp {
    base_url: String,
    client: Client,
    retry: RetryPolicy,
}

impl UpstreamHttp {
    pub fn new(base_url: &str) -> Result<Self, HttpError> {
        Self::with_options(base_url, DEFAULT_REQUEST_TIMEOUT, RetryPolicy::None)
    }

    pub fn with_options(
        base_url: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Absolute URL for a path relative to the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // ── Request methods ──────────────────────────────────────────────────

    /// GET, retried per the client's [`RetryPolicy`].
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, HttpError> {
        let Some(config) = self.retry.config() else {
            return self.do_request(&Method::GET, url, None::<&()>).await;
        };

        let mut attempt = 0;
        loop {
            let error = match self.do_request(&Method::GET, url, None::<&()>).await {
                Ok(parsed) => return Ok(parsed),
                Err(e) => e,
            };
            if !config.is_retryable(&error) {
                return Err(error);
            }
            if attempt >= config.max_retries {
                return Err(HttpError::MaxRetriesExceeded {
                    attempts: attempt + 1,
                    last_error: error.to_string(),
                });
            }

            let delay = config.delay_after(&error, attempt);
            tracing::debug!(
                url,
                attempt = attempt + 1,
                max = config.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "retrying upstream read"
            );
            futures_timer::Delay::new(delay).await;
            attempt += 1;
        }
    }

    /// POST, always a single attempt: actions are not idempotent.
    pub(crate) async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, HttpError> {
        self.do_request(&Method::POST, url, Some(body)).await
    }

    async fn do_request<T: DeserializeOwned, B: Serialize>(
        &self,
        method: &Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<T, HttpError> {
        let mut req = self
            .client
            .request(method.clone(), url)
            .header("Accept", "application/json");

        if let Some(b) = body {
            req = req.json(b);
        }

        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout
            } else {
                HttpError::Reqwest(e)
            }
        })?;
        let status = resp.status();

        if status.is_success() {
            let parsed = resp.json::<T>().await?;
            return Ok(parsed);
        }

        let status_code = status.as_u16();
        let retry_after_ms = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(|secs| secs.saturating_mul(1000));
        let body_text = resp.text().await.unwrap_or_default();

        Err(status_error(status_code, body_text, retry_after_ms))
    }
}

fn status_error(status: u16, body: String, retry_after_ms: Option<u64>) -> HttpError {
    match status {
        401 => HttpError::Unauthorized,
        404 => HttpError::NotFound(body),
        429 => HttpError::RateLimited { retry_after_ms },
        400..=499 => HttpError::BadRequest(body),
        _ => HttpError::ServerError { status, body },
    }
}
