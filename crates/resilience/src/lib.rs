// crates/resilience/src/lib.rs
//! Resilience combinators for fallible, cancellable operations
//!
//! Each combinator takes an [`Operation`] and returns a new operation with
//! the same shape, so they stack in any order:
//! - Circuit breaker with exponential cooldown
//! - Debouncer that replays the last outcome inside a sliding window
//! - Retry with a fixed delay and cancellation between attempts
//!
//! # Example
//!
//! ```rust
//! use ward_resilience::{operation_fn, Context, Operation, OperationExt, ResilienceError};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let service_call = operation_fn(|_ctx| async {
//!     Err::<String, _>(ResilienceError::msg("some sort of error"))
//! });
//!
//! // Retry a call that is protected by a circuit breaker
//! let op = service_call
//!     .with_circuit_breaker(5)
//!     .with_retry(2, Duration::from_millis(1));
//!
//! let result = op.call(Context::new()).await;
//! assert!(result.is_err());
//! # }
//! ```

mod circuit_breaker;
mod context;
mod debounce;
mod error;
mod operation;
mod retry;

pub use circuit_breaker::{
    breaker, CircuitBreaker, CircuitBreakerConfig, CircuitState, CooldownAnchor,
};
pub use context::Context;
pub use debounce::{debounce, Debouncer};
pub use error::{OperationError, ResilienceError, ResilienceResult};
pub use operation::{operation_fn, Operation, OperationExt};
pub use retry::{retry, Retrier, RetryPolicy};
