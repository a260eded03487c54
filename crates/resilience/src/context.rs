// crates/resilience/src/context.rs
//! Cancellation-aware execution context passed to every operation

use crate::error::{ResilienceError, ResilienceResult};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Execution context carrying a cancellation signal and an optional deadline
///
/// Clones share the same cancellation token, so a caller keeps one clone to
/// cancel and hands another to the operation.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// Creates a fresh context with no deadline
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context nothing else holds a handle to.
    ///
    /// It is never cancelled unless the returned value itself is.
    pub fn background() -> Self {
        Self::default()
    }

    /// Creates a context driven by an existing cancellation token
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Sets a deadline, keeping the earlier one if a deadline is already set
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Sets a deadline relative to now
    ///
    /// A timeout past the clock's range leaves the context without a new
    /// deadline.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Derives a context cancelled with this one but cancellable on its own
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Cancels this context and every context derived from it
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns the deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the underlying cancellation token
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Returns true once the context is cancelled or past its deadline
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Returns why the context is done, or `None` while it is still live
    pub fn err(&self) -> Option<ResilienceError> {
        if self.token.is_cancelled() {
            return Some(ResilienceError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ResilienceError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves when the context is cancelled or its deadline passes
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Waits for `duration` unless the context ends first
    pub async fn sleep(&self, duration: Duration) -> ResilienceResult<()> {
        tokio::select! {
            biased;
            _ = self.done() => Err(self.err().unwrap_or(ResilienceError::Cancelled)),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
