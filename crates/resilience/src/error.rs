// crates/resilience/src/error.rs
//! Error types for resilience operations

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result type for resilience operations
pub type ResilienceResult<T> = Result<T, ResilienceError>;

/// Boxed error produced by a wrapped operation
pub type OperationError = Arc<dyn std::error::Error + Send + Sync>;

/// Errors that can occur in resilience operations
///
/// Errors are `Clone` so a debouncer can replay the same failure to every
/// caller that lands inside its window.
#[derive(Debug, Clone, Error)]
pub enum ResilienceError {
    /// Circuit breaker rejected the call without invoking the operation
    #[error("circuit breaker: too many attempts (failures: {failures}, retry in {retry_in:?})")]
    CircuitOpen {
        failures: usize,
        retry_in: Duration,
    },

    /// Context was cancelled while waiting
    #[error("Operation was cancelled")]
    Cancelled,

    /// Context deadline passed while waiting
    #[error("Operation deadline exceeded")]
    DeadlineExceeded,

    /// The wrapped operation failed
    #[error("{0}")]
    Operation(OperationError),

    /// Custom error
    #[error("{0}")]
    Custom(String),
}

impl ResilienceError {
    /// Wraps an error returned by the inner operation
    pub fn operation<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Operation(Arc::new(error))
    }

    /// Creates a custom error from a message
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Returns true if a circuit breaker rejected the call
    pub fn is_short_circuit(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    /// Returns true if the caller's context ended the call
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}
