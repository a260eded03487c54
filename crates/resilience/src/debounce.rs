// crates/resilience/src/debounce.rs
//! Debouncing: replay the last outcome for calls that arrive too soon

use crate::context::Context;
use crate::error::ResilienceResult;
use crate::operation::Operation;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Instant before which calls replay the cache
#[derive(Debug, Clone, Copy)]
enum NotBefore {
    Unset,
    At(Instant),
    /// `now + window` is past the clock's range
    Never,
}

impl NotBefore {
    fn after(window: Duration) -> Self {
        Instant::now()
            .checked_add(window)
            .map_or(NotBefore::Never, NotBefore::At)
    }

    fn replays(self) -> bool {
        match self {
            NotBefore::Unset => false,
            NotBefore::At(not_before) => Instant::now() < not_before,
            NotBefore::Never => true,
        }
    }
}

#[derive(Debug)]
struct DebounceState<T> {
    not_before: NotBefore,
    cached: Option<ResilienceResult<T>>,
}

/// Wraps an operation so calls inside a sliding window replay the last outcome
///
/// Every call, replayed or not, pushes the window out to `now + window`, so
/// a steady stream of calls keeps replaying. Failures are cached and replayed
/// the same way as values. Clones share state.
pub struct Debouncer<O: Operation> {
    inner: Arc<O>,
    window: Duration,
    state: Arc<Mutex<DebounceState<O::Output>>>,
}

impl<O: Operation> Clone for Debouncer<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            window: self.window,
            state: Arc::clone(&self.state),
        }
    }
}

/// Wraps `operation` in a debouncer with the given window
pub fn debounce<O>(operation: O, window: Duration) -> Debouncer<O>
where
    O: Operation,
    O::Output: Clone,
{
    Debouncer::new(operation, window)
}

impl<O: Operation> Debouncer<O> {
    /// Creates a new debouncer around `operation`
    pub fn new(operation: O, window: Duration) -> Self {
        Self {
            inner: Arc::new(operation),
            window,
            state: Arc::new(Mutex::new(DebounceState {
                not_before: NotBefore::Unset,
                cached: None,
            })),
        }
    }

    /// Returns the debounce window
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl<O> Operation for Debouncer<O>
where
    O: Operation,
    O::Output: Clone,
{
    type Output = O::Output;

    fn call(&self, ctx: Context) -> impl Future<Output = ResilienceResult<O::Output>> + Send {
        async move {
            // held across the inner call so concurrent callers cannot both invoke
            let mut state = self.state.lock().await;

            let replay = if state.not_before.replays() {
                state.cached.clone()
            } else {
                None
            };

            let outcome = match replay {
                Some(outcome) => {
                    log::trace!("Debounced call, replaying cached outcome");
                    outcome
                }
                None => {
                    let outcome = self.inner.call(ctx).await;
                    state.cached = Some(outcome.clone());
                    outcome
                }
            };

            state.not_before = NotBefore::after(self.window);
            outcome
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResilienceError;
    use crate::operation::operation_fn;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(calls: Arc<AtomicUsize>) -> impl Operation<Output = usize> {
        operation_fn(move |_ctx| {
            let calls = Arc::clone(&calls);
            async move { Ok(calls.fetch_add(1, Ordering::SeqCst) + 1) }
        })
    }

    #[test]
    fn test_window_accessor() {
        let calls = Arc::new(AtomicUsize::new(0));
        let debouncer = debounce(counting(calls), Duration::from_millis(10));
        assert_eq!(debouncer.window(), Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_call_invokes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let debouncer = debounce(counting(Arc::clone(&calls)), Duration::from_secs(1));

        assert_eq!(debouncer.call(Context::new()).await.ok(), Some(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_within_window_replays() {
        let calls = Arc::new(AtomicUsize::new(0));
        let debouncer = debounce(counting(Arc::clone(&calls)), Duration::from_secs(1));

        let first = debouncer.call(Context::new()).await;
        tokio::time::advance(Duration::from_millis(500)).await;
        let second = debouncer.call(Context::new()).await;

        assert_eq!(first.ok(), second.ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_after_window_invokes_again() {
        let calls = Arc::new(AtomicUsize::new(0));
        let debouncer = debounce(counting(Arc::clone(&calls)), Duration::from_secs(1));

        let _ = debouncer.call(Context::new()).await;
        tokio::time::advance(Duration::from_millis(1_001)).await;
        let second = debouncer.call(Context::new()).await;

        assert_eq!(second.ok(), Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_extends_window() {
        let calls = Arc::new(AtomicUsize::new(0));
        let window = Duration::from_secs(1);
        let debouncer = debounce(counting(Arc::clone(&calls)), window);

        let _ = debouncer.call(Context::new()).await;
        tokio::time::advance(Duration::from_millis(600)).await;
        let _ = debouncer.call(Context::new()).await;

        // 1.5s after the original call but still inside the replay's window
        tokio::time::advance(window - Duration::from_millis(100)).await;
        assert_eq!(debouncer.call(Context::new()).await.ok(), Some(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(window + Duration::from_millis(1)).await;
        assert_eq!(debouncer.call(Context::new()).await.ok(), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_window_never_reinvokes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let debouncer = debounce(counting(Arc::clone(&calls)), Duration::MAX);

        assert_eq!(debouncer.call(Context::new()).await.ok(), Some(1));
        tokio::time::advance(Duration::from_secs(86_400)).await;
        assert_eq!(debouncer.call(Context::new()).await.ok(), Some(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_replayed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let op = operation_fn(move |_ctx| {
            let calls = Arc::clone(&calls_clone);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<String, _>(ResilienceError::msg("upstream unavailable"))
            }
        });
        let debouncer = debounce(op, Duration::from_secs(1));

        let first = debouncer.call(Context::new()).await;
        let second = debouncer.call(Context::new()).await;

        assert!(matches!(second, Err(ResilienceError::Custom(ref msg)) if msg == "upstream unavailable"));
        assert_eq!(
            first.err().map(|e| e.to_string()),
            Some(String::from("upstream unavailable"))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_invoke_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let op = operation_fn(move |_ctx| {
            let calls = Arc::clone(&calls_clone);
            async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(calls.fetch_add(1, Ordering::SeqCst) + 1)
            }
        });
        let debouncer = debounce(op, Duration::from_secs(1));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let debouncer = debouncer.clone();
                tokio::spawn(async move { debouncer.call(Context::new()).await })
            })
            .collect();

        for handle in handles {
            let result = handle.await.expect("task panicked");
            assert_eq!(result.ok(), Some(1));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
