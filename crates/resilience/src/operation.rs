// crates/resilience/src/operation.rs
//! The operation shape shared by every combinator

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::context::Context;
use crate::debounce::Debouncer;
use crate::error::ResilienceResult;
use crate::retry::{RetryPolicy, Retrier};
use std::future::Future;
use std::time::Duration;

/// A fallible, cancellable unit of work
///
/// Combinators take an operation and return another operation with the same
/// `Output`, so wrappers stack in any order.
pub trait Operation: Send + Sync {
    /// Value produced on success
    type Output: Send;

    /// Invokes the operation with an execution context
    fn call(&self, ctx: Context) -> impl Future<Output = ResilienceResult<Self::Output>> + Send;
}

impl<F, Fut, T> Operation for F
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = ResilienceResult<T>> + Send,
    T: Send,
{
    type Output = T;

    fn call(&self, ctx: Context) -> impl Future<Output = ResilienceResult<T>> + Send {
        self(ctx)
    }
}

/// Turns an async closure into an operation.
///
/// Only needed to help closure type inference; any matching closure already
/// implements [`Operation`].
pub fn operation_fn<F, Fut, T>(f: F) -> F
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = ResilienceResult<T>> + Send,
    T: Send,
{
    f
}

/// Fluent wrappers for stacking combinators
pub trait OperationExt: Operation + Sized {
    /// Wraps the operation in a circuit breaker
    fn with_circuit_breaker(self, failure_threshold: usize) -> CircuitBreaker<Self> {
        CircuitBreaker::new(self, CircuitBreakerConfig::new(failure_threshold))
    }

    /// Wraps the operation in a debouncer
    fn debounced(self, window: Duration) -> Debouncer<Self>
    where
        Self::Output: Clone,
    {
        Debouncer::new(self, window)
    }

    /// Wraps the operation in a retrier
    fn with_retry(self, max_retries: usize, delay: Duration) -> Retrier<Self> {
        Retrier::new(self, RetryPolicy::new(max_retries, delay))
    }
}

impl<O: Operation> OperationExt for O {}
