// crates/resilience/src/circuit_breaker.rs
//! Circuit breaker pattern implementation

use crate::context::Context;
use crate::error::{ResilienceError, ResilienceResult};
use crate::operation::Operation;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::Instant;

/// Circuit breaker states, derived from the failure count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Failures are within the threshold, calls flow normally
    Closed,
    /// Threshold exceeded and cooldown running, calls are rejected
    Open,
    /// Cooldown elapsed, the next call is let through as a probe
    HalfOpen,
}

/// Instant the cooldown window is measured from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CooldownAnchor {
    /// Measured from breaker construction and never refreshed
    #[default]
    Construction,
    /// Refreshed on every failed call
    LastFailure,
}

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures tolerated before backoff engages
    failure_threshold: usize,
    /// Cooldown for the first failure past the threshold, doubled after that
    base_cooldown: Duration,
    /// Where cooldown windows start
    anchor: CooldownAnchor,
}

impl CircuitBreakerConfig {
    /// Creates a new configuration with a one second base cooldown
    pub fn new(failure_threshold: usize) -> Self {
        Self {
            failure_threshold,
            base_cooldown: Duration::from_secs(1),
            anchor: CooldownAnchor::default(),
        }
    }

    /// Sets the base cooldown
    pub fn with_base_cooldown(mut self, base_cooldown: Duration) -> Self {
        self.base_cooldown = base_cooldown;
        self
    }

    /// Sets the cooldown anchor
    pub fn with_anchor(mut self, anchor: CooldownAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Returns the failure threshold
    pub fn failure_threshold(&self) -> usize {
        self.failure_threshold
    }

    /// Returns the base cooldown
    pub fn base_cooldown(&self) -> Duration {
        self.base_cooldown
    }

    /// Returns the cooldown anchor
    pub fn anchor(&self) -> CooldownAnchor {
        self.anchor
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self::new(5)
    }
}

#[derive(Debug)]
struct CircuitBreakerState {
    failure_count: usize,
    reference_time: Instant,
}

/// Wraps an operation and stops forwarding calls once it keeps failing
///
/// After more than `failure_threshold` consecutive failures the breaker
/// rejects calls until `base_cooldown * 2^(failures - threshold)` has passed
/// since the anchor instant. Clones share state.
#[derive(Debug)]
pub struct CircuitBreaker<O> {
    inner: Arc<O>,
    config: CircuitBreakerConfig,
    state: Arc<RwLock<CircuitBreakerState>>,
}

impl<O> Clone for CircuitBreaker<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            config: self.config.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

/// Wraps `operation` in a circuit breaker with default cooldown settings
pub fn breaker<O: Operation>(operation: O, failure_threshold: usize) -> CircuitBreaker<O> {
    CircuitBreaker::new(operation, CircuitBreakerConfig::new(failure_threshold))
}

impl<O> CircuitBreaker<O> {
    /// Creates a new circuit breaker around `operation`
    pub fn new(operation: O, config: CircuitBreakerConfig) -> Self {
        Self {
            inner: Arc::new(operation),
            config,
            state: Arc::new(RwLock::new(CircuitBreakerState {
                failure_count: 0,
                reference_time: Instant::now(),
            })),
        }
    }

    /// Returns the configuration
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Gets the current state
    pub fn state(&self) -> CircuitState {
        let Ok(state) = self.state.read() else {
            return CircuitState::Open;
        };
        match self.retry_at(&state) {
            None => CircuitState::Closed,
            Some(Some(retry_at)) if Instant::now() > retry_at => CircuitState::HalfOpen,
            Some(_) => CircuitState::Open,
        }
    }

    /// Cooldown applied when the failure count exceeds the threshold by `excess`
    pub fn cooldown_for(&self, excess: usize) -> Duration {
        backoff(self.config.base_cooldown, excess)
    }

    /// `None` while closed; otherwise the instant calls resume, or `None`
    /// inside when that instant is past the clock's range.
    fn retry_at(&self, state: &CircuitBreakerState) -> Option<Option<Instant>> {
        match state.failure_count.checked_sub(self.config.failure_threshold) {
            Some(excess) if excess > 0 => {
                let cooldown = self.cooldown_for(excess);
                Some(state.reference_time.checked_add(cooldown))
            }
            _ => None,
        }
    }

    /// Rejects the call while the cooldown is running
    fn check(&self) -> ResilienceResult<()> {
        let state = self
            .state
            .read()
            .map_err(|_| ResilienceError::msg("Lock poisoned"))?;

        let now = Instant::now();
        match self.retry_at(&state) {
            None => Ok(()),
            Some(Some(retry_at)) if now > retry_at => {
                log::debug!(
                    "Circuit breaker half-open after {} failures, letting call through",
                    state.failure_count
                );
                Ok(())
            }
            Some(retry_at) => {
                let retry_in = retry_at
                    .map(|at| at.saturating_duration_since(now))
                    .unwrap_or(Duration::MAX);
                log::trace!("Circuit breaker rejected call, retry in {:?}", retry_in);
                Err(ResilienceError::CircuitOpen {
                    failures: state.failure_count,
                    retry_in,
                })
            }
        }
    }

    fn record<T>(&self, outcome: &ResilienceResult<T>) {
        let Ok(mut state) = self.state.write() else {
            log::warn!("Circuit breaker lock poisoned, outcome not recorded");
            return;
        };

        match outcome {
            Ok(_) => {
                if state.failure_count > self.config.failure_threshold {
                    log::debug!("Circuit breaker closed after successful call");
                }
                state.failure_count = 0;
            }
            Err(_) => {
                state.failure_count = state.failure_count.saturating_add(1);
                if self.config.anchor == CooldownAnchor::LastFailure {
                    state.reference_time = Instant::now();
                }
                if state.failure_count == self.config.failure_threshold.saturating_add(1) {
                    log::debug!(
                        "Circuit breaker opened after {} consecutive failures",
                        state.failure_count
                    );
                }
            }
        }
    }
}

impl<O: Operation> Operation for CircuitBreaker<O> {
    type Output = O::Output;

    fn call(&self, ctx: Context) -> impl Future<Output = ResilienceResult<O::Output>> + Send {
        async move {
            self.check()?;
            let outcome = self.inner.call(ctx).await;
            self.record(&outcome);
            outcome
        }
    }
}

/// `base * 2^excess`, saturating at `Duration::MAX`
fn backoff(base: Duration, excess: usize) -> Duration {
    if base.is_zero() {
        return Duration::ZERO;
    }
    u32::try_from(excess)
        .ok()
        .and_then(|exp| 2u32.checked_pow(exp))
        .and_then(|factor| base.checked_mul(factor))
        .unwrap_or(Duration::MAX)
}
