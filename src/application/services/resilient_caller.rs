//! Bounded retry with exponential backoff around remote calls.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::domain::errors::{AnalysisError, ModelError};

/// Default number of attempts, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default wait before the first retry.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(4);
/// Default upper bound on any single wait.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

/// Retry limits and backoff bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    /// Wait before the first retry.
    pub min_delay: Duration,
    /// Upper bound on any single wait.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_delay: DEFAULT_MIN_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Default policy: three attempts, 4s doubling up to 10s.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy that never retries.
    #[must_use]
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Sets the attempt budget.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the backoff bounds.
    #[must_use]
    pub const fn with_delays(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self.max_delay = max_delay;
        self
    }

    /// Wait before retry number `retry` (1 for the first retry):
    /// `min_delay` doubled per further retry, capped at `max_delay`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let base = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis().max(self.min_delay.as_millis()) as u64;

        let exponent = retry.saturating_sub(1).min(32);
        let delay = base.saturating_mul(2_u64.saturating_pow(exponent));

        Duration::from_millis(delay.min(max))
    }
}

type Classifier = Arc<dyn Fn(&ModelError) -> bool + Send + Sync>;

/// Runs a remote operation under a [`RetryPolicy`].
///
/// Only failures the classifier marks transient are retried; by default that
/// is [`ModelError::is_transient`].
#[derive(Clone)]
pub struct ResilientCaller {
    policy: RetryPolicy,
    is_transient: Classifier,
}

impl ResilientCaller {
    /// Creates a caller that retries transient model errors.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            is_transient: Arc::new(ModelError::is_transient),
        }
    }

    /// Replaces the transient-failure classifier.
    #[must_use]
    pub fn with_classifier(
        mut self,
        classifier: impl Fn(&ModelError) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.is_transient = Arc::new(classifier);
        self
    }

    /// Active retry policy.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Invokes `request` until it succeeds, fails permanently, or the attempt
    /// budget is spent.
    ///
    /// # Errors
    /// Returns `AnalysisError::RemoteCallFailed` wrapping the last failure.
    pub async fn call<T, F, Fut>(&self, request: F) -> Result<T, AnalysisError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ModelError>>,
    {
        self.call_with_cancel(&CancellationToken::new(), request)
            .await
    }

    /// Like [`Self::call`], but stops promptly once `cancel` fires, including
    /// during a backoff sleep.
    ///
    /// # Errors
    /// Returns `AnalysisError::RemoteCallFailed` wrapping the last failure, or
    /// `AnalysisError::Cancelled`.
    pub async fn call_with_cancel<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut request: F,
    ) -> Result<T, AnalysisError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ModelError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(AnalysisError::Cancelled);
            }

            attempt += 1;

            let outcome = tokio::select! {
                () = cancel.cancelled() => return Err(AnalysisError::Cancelled),
                outcome = request() => outcome,
            };

            let err = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Remote call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if !(self.is_transient)(&err) {
                error!(attempt, error = %err, "Remote call failed permanently");
                return Err(AnalysisError::remote(attempt, err));
            }

            if attempt >= max_attempts {
                error!(
                    attempts = attempt,
                    error = %err,
                    "Max remote call attempts exceeded"
                );
                return Err(AnalysisError::remote(attempt, err));
            }

            let delay = self.policy.delay_before_retry(attempt);
            warn!(
                attempt,
                delay_ms = delay.as_millis(),
                error = %err,
                "Remote call failed, retrying"
            );

            tokio::select! {
                () = cancel.cancelled() => return Err(AnalysisError::Cancelled),
                () = sleep(delay) => {}
            }
        }
    }
}

impl Default for ResilientCaller {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl fmt::Debug for ResilientCaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientCaller")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
