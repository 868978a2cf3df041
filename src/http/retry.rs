//! Retry policies for upstream reads.
//!
//! Upstream calls are single-attempt by default: a failed refresh surfaces to
//! the caller, which decides when to refresh again. A [`RetryConfig`] can be
//! opted into per client. It only ever applies to GET listings; action POSTs
//! are sent exactly once.

use std::time::Duration;

use rand::Rng;

use crate::error::HttpError;

/// Retry policy for an upstream client.
#[derive(Debug, Clone, Default)]
pub enum RetryPolicy {
    /// Single attempt. The default for every upstream.
    #[default]
    None,
    /// Retry reads that fail with a retryable error, with backoff.
    Custom(RetryConfig),
}

impl RetryPolicy {
    /// Backoff settings for reads; `None` when single-attempt.
    pub fn config(&self) -> Option<&RetryConfig> {
        match self {
            Self::None => None,
            Self::Custom(config) => Some(config),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Growth of the delay between consecutive retries.
    pub backoff_factor: f64,
    /// Spread each delay by up to ±25%.
    pub jitter: bool,
    /// Statuses worth another attempt. Include 429 to retry rate limits.
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            backoff_factor: 2.0,
            jitter: true,
            retryable_statuses: vec![502, 503, 504],
        }
    }
}

impl RetryConfig {
    /// Defaults plus rate-limit retries, honoring `Retry-After`.
    pub fn idempotent() -> Self {
        Self {
            retryable_statuses: vec![429, 502, 503, 504],
            ..Self::default()
        }
    }

    pub fn is_retryable(&self, error: &HttpError) -> bool {
        match error {
            HttpError::ServerError { status, .. } => self.retryable_statuses.contains(status),
            HttpError::RateLimited { .. } => self.retryable_statuses.contains(&429),
            HttpError::Timeout => true,
            #[cfg(feature = "http")]
            HttpError::Reqwest(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }

    /// Wait before retry `attempt + 1`. A server-provided `Retry-After` wins
    /// over the backoff; both are capped at `max_delay`.
    pub fn delay_after(&self, error: &HttpError, attempt: u32) -> Duration {
        match error {
            HttpError::RateLimited {
                retry_after_ms: Some(ms),
            } => Duration::from_millis(*ms).min(self.max_delay),
            _ => self.delay_for_attempt(attempt),
        }
    }

    /// Exponential backoff for retry `attempt + 1` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let grown = self.initial_delay.as_millis() as f64 * self.backoff_factor.powi(exponent);
        let ceiling = self.max_delay.as_millis() as f64;
        let ms = if grown.is_finite() { grown.min(ceiling) } else { ceiling };

        let spread = if self.jitter {
            rand::thread_rng().gen_range(0.75..=1.25)
        } else {
            1.0
        };
        Duration::from_millis((ms * spread).max(0.0) as u64)
    }
}
