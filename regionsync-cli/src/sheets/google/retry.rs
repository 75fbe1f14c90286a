//! Retry policy for Google Sheets API calls
//!
//! Exponential backoff with optional jitter. Reads and overwrites retry on
//! throttling (429), server errors (5xx), timeouts and refused connections.
//! Structural edits (`batchUpdate`) only retry when the request cannot have
//! been applied: a 429 or a failure to connect.

use std::time::Duration;

use rand::Rng;
use reqwest::StatusCode;

/// Retry behaviour for a single API call
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, the first call included
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Single attempt, no waiting
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::from_millis(0),
            max_delay: Duration::from_millis(0),
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }
}

/// Whether repeating a request can change the outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Reads and value overwrites
    Idempotent,
    /// Row deletions and insertions
    NonIdempotent,
}

/// Applies a `RetryConfig`
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// Whether a response status is worth another attempt
    pub fn is_retryable_status(status: StatusCode, kind: RequestKind) -> bool {
        match kind {
            RequestKind::Idempotent => {
                status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            // A 5xx may arrive after the edit was applied
            RequestKind::NonIdempotent => status == StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Whether a transport error is worth another attempt
    pub fn is_retryable_error(err: &reqwest::Error, kind: RequestKind) -> bool {
        match kind {
            RequestKind::Idempotent => err.is_timeout() || err.is_connect(),
            RequestKind::NonIdempotent => err.is_connect() && !err.is_timeout(),
        }
    }

    /// Backoff before retry number `attempt` (1 = first retry), without jitter
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let millis = self.config.base_delay.as_millis() as f64
            * self.config.backoff_multiplier.powi(exponent);
        let capped = millis.min(self.config.max_delay.as_millis() as f64);
        Duration::from_millis(capped.max(0.0) as u64)
    }

    /// Backoff before retry number `attempt`, with jitter applied when enabled
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self.base_delay_for(attempt);
        if !self.config.jitter || delay.is_zero() {
            return delay;
        }
        // Uniform between half and the whole delay
        let half = delay.as_millis() as u64 / 2;
        let jittered = half + rand::rng().random_range(0..=half);
        Duration::from_millis(jittered)
    }
}
