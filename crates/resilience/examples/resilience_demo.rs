// crates/resilience/examples/resilience_demo.rs
//! Demonstration of resilience combinators
//!
//! Run with `RUST_LOG=debug` to see breaker and retry transitions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use ward_resilience::{
    breaker, debounce, operation_fn, retry, Context, Operation, ResilienceError,
};

#[tokio::main]
async fn main() {
    env_logger::init();

    println!("Resilience Combinators Demo");
    println!("===========================\n");

    demo_circuit_breaker().await;
    println!();
    demo_debounce().await;
    println!();
    demo_retry().await;
}

async fn demo_circuit_breaker() {
    println!("1. Circuit Breaker");
    println!("------------------");

    let service_call = operation_fn(|_ctx| async {
        Err::<String, _>(ResilienceError::msg("some sort of error"))
    });
    let cb = breaker(service_call, 5);

    let ctx = Context::new();
    for i in 1..=10 {
        match cb.call(ctx.clone()).await {
            Ok(value) => println!("  Request {}: ✓ {}", i, value),
            Err(e) if e.is_short_circuit() => println!("  Request {}: ⊘ {}", i, e),
            Err(e) => println!("  Request {}: ✗ {}", i, e),
        }
    }

    println!("  Circuit state: {:?}", cb.state());
}

async fn demo_debounce() {
    println!("2. Debounce");
    println!("-----------");

    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invocations);
    let fetch = operation_fn(move |_ctx| {
        let counter = Arc::clone(&counter);
        async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("fetching data... (#{})", n))
        }
    });
    let debounced = debounce(fetch, Duration::from_millis(10));

    for i in 0..=10 {
        match debounced.call(Context::background()).await {
            Ok(value) => println!("  Call {}: {}", i, value),
            Err(e) => println!("  Call {}: ✗ {}", i, e),
        }
    }

    tokio::time::sleep(Duration::from_millis(20)).await;
    if let Ok(value) = debounced.call(Context::background()).await {
        println!("  After window: {}", value);
    }

    println!("  Inner invocations: {}", invocations.load(Ordering::SeqCst));
}

async fn demo_retry() {
    println!("3. Retry");
    println!("--------");

    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let effector = operation_fn(move |_ctx| {
        let counter = Arc::clone(&counter);
        async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            println!("  Attempt {}", n);
            if n <= 4 {
                Err(ResilienceError::msg("invalid i"))
            } else {
                Ok(String::from("alright!"))
            }
        }
    });
    let retrier = retry(effector, 10, Duration::from_millis(100));

    match retrier.call(Context::new()).await {
        Ok(value) => println!("✓ Success after retries: {}", value),
        Err(e) => println!("✗ Failed: {}", e),
    }
}
