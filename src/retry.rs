//! Retry policy for calls to external services.
//!
//! The default policy makes a single attempt. Retries are opt-in through
//! `service.max_retries` and only apply to service-call errors.

use crate::config::ServiceSettings;
use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How many times to retry a failed service call and how long to wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub max_retries: usize,
    /// Base delay, doubled on every retry.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    /// Build a policy from service settings.
    pub fn from_settings(settings: &ServiceSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            backoff: Duration::from_millis(settings.retry_backoff_ms),
        }
    }

    /// Delay before the given retry attempt (1-based).
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let capped = attempt.saturating_sub(1).min(5) as u32;
        self.backoff * (1 << capped)
    }

    /// Run `op`, retrying service errors according to the policy.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0usize;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_service_error() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        what,
                        attempt,
                        self.max_retries + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}
