//! Retry with exponential backoff for calls to unreliable remote services.
//!
//! [`RetryExecutor::execute`] wraps any async operation. Only errors whose
//! [`Retryable::is_transient`] returns `true` are retried; everything else
//! propagates on first occurrence. When attempts run out, the last error is
//! returned as-is so callers still see its classification and context.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::error::{AgentError, ServiceError};

/// Default retries after the first attempt.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default delay before the first retry.
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
/// Default delay cap.
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);
/// Default backoff multiplier.
const DEFAULT_MULTIPLIER: f64 = 2.0;
/// Jitter spread as a fraction of the computed delay.
const JITTER_FRACTION: f64 = 0.2;

/// Classification of an error for retry purposes.
pub trait Retryable {
    /// Returns `true` for connection, timeout/rate-limit and server errors.
    fn is_transient(&self) -> bool;

    /// Minimum wait the service asked for before the next attempt.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl Retryable for ServiceError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::RateLimited { .. } | Self::Server { .. }
        )
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl Retryable for AgentError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Service(e) => e.is_transient(),
            // No status means the request never got an answer.
            Self::ApiRequest { status, .. } => {
                status.is_none_or(|s| s == 408 || s == 429 || (500..=599).contains(&s))
            }
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Service(e) => e.retry_after(),
            _ => None,
        }
    }
}

/// Backoff settings. Immutable once built; see [`RetryConfig::new`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: bool,
    multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: true,
            multiplier: DEFAULT_MULTIPLIER,
        }
    }
}

impl RetryConfig {
    /// Creates a validated retry configuration.
    ///
    /// `max_attempts` counts retries after the first call, so the operation
    /// runs at most `max_attempts + 1` times.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidConfig`] if `base_delay` is zero,
    /// `max_delay < base_delay`, or `multiplier` is below 1 or not finite.
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        jitter: bool,
        multiplier: f64,
    ) -> Result<Self, AgentError> {
        if base_delay.is_zero() {
            return Err(AgentError::InvalidConfig {
                message: "retry base delay must be greater than zero".to_string(),
            });
        }
        if max_delay < base_delay {
            return Err(AgentError::InvalidConfig {
                message: format!(
                    "retry max delay ({max_delay:?}) must be >= base delay ({base_delay:?})"
                ),
            });
        }
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(AgentError::InvalidConfig {
                message: format!("retry multiplier must be a finite value >= 1, got {multiplier}"),
            });
        }
        Ok(Self {
            max_attempts,
            base_delay,
            max_delay,
            jitter,
            multiplier,
        })
    }

    /// Returns a copy with a different retry count.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Retries after the first attempt.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the first retry.
    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Delay cap.
    #[must_use]
    pub const fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Whether jitter is applied.
    #[must_use]
    pub const fn jitter(&self) -> bool {
        self.jitter
    }

    /// Backoff multiplier.
    #[must_use]
    pub const fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Delay before retry `attempt` (1-based), without jitter:
    /// `min(base * multiplier^(attempt - 1), max)`.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = secs.min(self.max_delay.as_secs_f64());
        Duration::try_from_secs_f64(capped).unwrap_or(self.max_delay)
    }

    /// Delay before retry `attempt`, with jitter applied when enabled.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self.backoff(attempt);
        if !self.jitter {
            return delay;
        }
        let factor = 1.0 + rand::thread_rng().gen_range(-JITTER_FRACTION..=JITTER_FRACTION);
        Duration::try_from_secs_f64((delay.as_secs_f64() * factor).max(0.0)).unwrap_or(delay)
    }
}

/// Runs operations under a [`RetryConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Creates an executor for the given configuration.
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Runs `operation`, retrying transient failures with backoff.
    ///
    /// A server-provided [`Retryable::retry_after`] hint raises the sleep
    /// to at least that long. The sleep only suspends the calling task;
    /// sibling tasks keep running.
    ///
    /// # Errors
    ///
    /// Returns the first non-transient error, or the last transient error
    /// once `max_attempts` retries have been spent.
    pub async fn execute<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + std::fmt::Display,
    {
        let mut retries: u32 = 0;

        loop {
            match operation().await {
                Ok(value) => {
                    if retries > 0 {
                        debug!(retries, "operation succeeded after retrying");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_transient() && retries < self.config.max_attempts => {
                    retries += 1;
                    let backoff = self.config.delay_for(retries);
                    let delay = err.retry_after().map_or(backoff, |hint| backoff.max(hint));
                    warn!(
                        attempt = retries,
                        max_attempts = self.config.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    if err.is_transient() {
                        warn!(attempts = retries + 1, error = %err, "retries exhausted");
                    } else {
                        debug!(error = %err, "non-retryable error");
                    }
                    return Err(err);
                }
            }
        }
    }
}
