//! Bounded retry with exponential backoff under one overall deadline.

use std::{fmt, sync::Arc, time::Duration};
use tracing::{debug, warn};

use crate::{FetchError, PolicyError, WeatherData, WeatherSource};

/// How hard to try before giving up on a single city.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    base_delay: Duration,
    max_attempts: u32,
    overall_timeout: Duration,
}

impl RetryPolicy {
    pub fn new(
        base_delay: Duration,
        max_attempts: u32,
        overall_timeout: Duration,
    ) -> Result<Self, PolicyError> {
        if base_delay.is_zero() {
            return Err(PolicyError::NonPositive {
                field: "base_delay",
            });
        }
        if max_attempts == 0 {
            return Err(PolicyError::NonPositive {
                field: "max_attempts",
            });
        }
        if overall_timeout.is_zero() {
            return Err(PolicyError::NonPositive {
                field: "overall_timeout",
            });
        }

        Ok(Self {
            base_delay,
            max_attempts,
            overall_timeout,
        })
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn overall_timeout(&self) -> Duration {
        self.overall_timeout
    }

    /// Delay after the failed attempt number `attempt` (counted from 1):
    /// `base_delay * 2^(attempt - 1)`, saturating at `Duration::MAX`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt.saturating_sub(1))
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }
}

impl Default for RetryPolicy {
    /// One attempt plus three retries at 1s, 2s, 4s, all within 10s.
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_attempts: 4,
            overall_timeout: Duration::from_secs(10),
        }
    }
}

/// Emitted before every retry; observability only.
#[derive(Debug, Clone)]
pub struct RetryNotice {
    pub city: String,
    /// Number of the attempt about to be made (2 for the first retry).
    pub attempt: u32,
    pub delay: Duration,
    /// Failure of the previous attempt.
    pub error: FetchError,
}

pub type RetryHook = Arc<dyn Fn(&RetryNotice) + Send + Sync>;

/// A [`WeatherSource`] wrapped in a [`RetryPolicy`].
#[derive(Clone)]
pub struct ResilientFetcher {
    source: Arc<dyn WeatherSource>,
    policy: RetryPolicy,
    on_retry: Option<RetryHook>,
}

impl fmt::Debug for ResilientFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientFetcher")
            .field("source", &self.source)
            .field("policy", &self.policy)
            .field("on_retry", &self.on_retry.is_some())
            .finish()
    }
}

impl ResilientFetcher {
    pub fn new(source: Arc<dyn WeatherSource>, policy: RetryPolicy) -> Self {
        Self {
            source,
            policy,
            on_retry: None,
        }
    }

    pub fn with_retry_hook(mut self, hook: RetryHook) -> Self {
        self.on_retry = Some(hook);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn source(&self) -> &Arc<dyn WeatherSource> {
        &self.source
    }

    pub async fn fetch(&self, city: &str) -> Result<WeatherData, FetchError> {
        run(self.source.as_ref(), city, &self.policy, self.on_retry.as_ref()).await
    }
}

/// Fetches `city` from `source`, retrying per `policy`.
///
/// Returns the last attempt's error unchanged once attempts run out, or
/// [`FetchError::Timeout`] if the overall deadline passes first; the deadline
/// cancels any in-progress attempt and pending backoff.
pub async fn resilient_fetch(
    source: &dyn WeatherSource,
    city: &str,
    policy: &RetryPolicy,
) -> Result<WeatherData, FetchError> {
    run(source, city, policy, None).await
}

async fn run(
    source: &dyn WeatherSource,
    city: &str,
    policy: &RetryPolicy,
    on_retry: Option<&RetryHook>,
) -> Result<WeatherData, FetchError> {
    let attempts = attempt_with_backoff(source, city, policy, on_retry);

    match tokio::time::timeout(policy.overall_timeout, attempts).await {
        Ok(result) => result,
        Err(_) => {
            let timeout_ms = policy.overall_timeout.as_millis() as u64;
            warn!(city, timeout_ms, "weather request timed out");
            Err(FetchError::timeout(format!(
                "Request for '{city}' timed out after {timeout_ms}ms"
            )))
        }
    }
}

async fn attempt_with_backoff(
    source: &dyn WeatherSource,
    city: &str,
    policy: &RetryPolicy,
    on_retry: Option<&RetryHook>,
) -> Result<WeatherData, FetchError> {
    let mut attempt = 1;

    loop {
        debug!(city, attempt, source = source.name(), "fetch attempt");

        let err = match source.fetch_one(city).await {
            Ok(data) => return Ok(data),
            Err(err) => err,
        };

        if !err.is_retryable() || attempt >= policy.max_attempts {
            return Err(err);
        }

        let delay = policy.backoff_delay(attempt);
        attempt += 1;

        warn!(
            city,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Retry attempt: {attempt}"
        );
        if let Some(hook) = on_retry {
            hook(&RetryNotice {
                city: city.to_string(),
                attempt,
                delay,
                error: err.clone(),
            });
        }

        tokio::time::sleep(delay).await;
    }
}
