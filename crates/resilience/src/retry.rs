// crates/resilience/src/retry.rs
//! Retry with a fixed delay between attempts

use crate::context::Context;
use crate::error::ResilienceResult;
use crate::operation::Operation;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts allowed after the first one
    max_retries: usize,
    /// Fixed wait between attempts
    delay: Duration,
}

impl RetryPolicy {
    /// Creates a new retry policy
    pub fn new(max_retries: usize, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Sets the number of retries
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the delay
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Returns the number of retries after the first attempt
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Returns the maximum number of attempts (including the first attempt)
    pub fn max_attempts(&self) -> usize {
        self.max_retries.saturating_add(1)
    }

    /// Returns the delay between attempts
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100))
    }
}

/// Wraps an operation and re-invokes it while it fails
///
/// Each attempt runs under a fresh [`Context::background`], so the caller's
/// cancellation cannot interrupt an attempt in flight. The caller's context
/// only governs the wait between attempts: once it ends, the retrier stops
/// and returns `Cancelled` or `DeadlineExceeded`.
#[derive(Debug)]
pub struct Retrier<O> {
    inner: Arc<O>,
    policy: RetryPolicy,
}

impl<O> Clone for Retrier<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            policy: self.policy.clone(),
        }
    }
}

/// Wraps `operation` in a retrier
pub fn retry<O: Operation>(operation: O, max_retries: usize, delay: Duration) -> Retrier<O> {
    Retrier::new(operation, RetryPolicy::new(max_retries, delay))
}

impl<O> Retrier<O> {
    /// Creates a new retrier around `operation`
    pub fn new(operation: O, policy: RetryPolicy) -> Self {
        Self {
            inner: Arc::new(operation),
            policy,
        }
    }

    /// Returns the retry policy
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl<O: Operation> Operation for Retrier<O> {
    type Output = O::Output;

    fn call(&self, ctx: Context) -> impl Future<Output = ResilienceResult<O::Output>> + Send {
        async move {
            let mut attempt = 0;
            loop {
                let outcome = self.inner.call(Context::background()).await;
                if outcome.is_ok() || attempt >= self.policy.max_retries {
                    return outcome;
                }

                attempt += 1;
                log::debug!(
                    "Attempt {} of {} failed, retrying in {:?}",
                    attempt,
                    self.policy.max_attempts(),
                    self.policy.delay
                );

                if let Err(e) = ctx.sleep(self.policy.delay).await {
                    log::debug!("Retry abandoned: {}", e);
                    return Err(e);
                }
            }
        }
    }
}
