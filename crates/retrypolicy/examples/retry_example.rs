//! Example: running operations under a RetryPolicy
//!
//! This example demonstrates:
//! 1. Retrying a flaky call with exponential backoff
//! 2. Rejecting unacceptable successes with a success predicate
//! 3. Only retrying specific errors
//! 4. Cancelling a retry loop that is waiting out a long backoff
//!
//! Run with:
//! ```bash
//! RUST_LOG=retrypolicy=debug cargo run -p retrypolicy --example retry_example
//! ```

use retrypolicy::prelude::*;
use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// A simulated API that fails the first few times
struct UnreliableApi {
    attempts: AtomicU32,
    fail_count: u32,
}

impl UnreliableApi {
    fn new(fail_count: u32) -> Self {
        Self {
            attempts: AtomicU32::new(0),
            fail_count,
        }
    }

    async fn call(&self) -> Result<String, std::io::Error> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        if attempt <= self.fail_count {
            println!("  Attempt {}: FAILED (simulating transient error)", attempt);
            Err(std::io::Error::other(format!("Transient error on attempt {}", attempt)))
        } else {
            println!("  Attempt {}: SUCCESS", attempt);
            Ok("API response data".to_string())
        }
    }

    fn total_attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

/// Example 1: Flaky call with exponential backoff
async fn example_simple_retry() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 1: Exponential Backoff ===\n");

    let policy = RetryPolicy::<String, std::io::Error>::builder()
        .max_retries(3)
        .accept_any_success()
        .backoff(
            ExponentialBackoff::builder()
                .initial_delay(Duration::from_millis(100))
                .multiplier(2.0)
                .jitter(0.0) // No jitter for predictable output
                .build(),
        )
        .on_retry(|err, retry| println!("  -> retry {} after: {:?}", retry, err.map(|e| e.to_string())))
        .build();

    let api = UnreliableApi::new(2);
    let start = Instant::now();

    let result = policy
        .execute(&CancellationToken::new(), || api.call())
        .await?;

    println!("\nResult: {}", result);
    println!("Total attempts: {}", api.total_attempts());
    println!("Total time: {:?}", start.elapsed());
    println!("Expected delays: 100ms + 200ms = ~300ms");

    Ok(())
}

/// Example 2: Polling until the value is acceptable
async fn example_success_predicate() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 2: Success Predicate (poll until ready) ===\n");

    let policy = RetryPolicy::<&'static str, std::io::Error>::builder()
        .max_retries(5)
        .success_predicates([|status: &&str| *status != "ready"])
        .backoff(ConstantBackoff::new(Duration::from_millis(20)))
        .build();

    let polls = Arc::new(AtomicU32::new(0));
    let status = policy
        .execute(&CancellationToken::new(), || {
            let polls = Arc::clone(&polls);
            async move {
                let n = polls.fetch_add(1, Ordering::SeqCst) + 1;
                let status = if n < 3 { "pending" } else { "ready" };
                println!("  Poll {}: {}", n, status);
                Ok(status)
            }
        })
        .await?;

    println!("Final status: {} after {} polls", status, polls.load(Ordering::SeqCst));

    Ok(())
}

/// Example 3: Only retry network errors
async fn example_should_handle() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 3: Custom Error Filter (Network Errors Only) ===\n");

    let policy = RetryPolicy::<(), std::io::Error>::builder()
        .max_retries(3)
        .should_handle(|err| err.to_string().to_lowercase().contains("network"))
        .backoff(ConstantBackoff::new(Duration::from_millis(10)))
        .build();

    println!("Test 1: Auth error (should NOT retry)");
    let attempts = AtomicU32::new(0);
    let result = policy
        .execute_void(&CancellationToken::new(), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                Err(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "auth failed",
                ))
            }
        })
        .await;
    assert!(result.is_err());
    println!("  Attempts: {}", attempts.load(Ordering::SeqCst));

    println!("\nTest 2: Network error (should retry until budget is spent)");
    attempts.store(0, Ordering::SeqCst);
    let result = policy
        .execute_void(&CancellationToken::new(), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(std::io::Error::other("network timeout")) }
        })
        .await;
    assert!(result.is_err());
    println!("  Attempts: {}", attempts.load(Ordering::SeqCst));

    Ok(())
}

/// Example 4: Cancellation interrupts a long backoff
async fn example_cancellation() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 4: Cancellation During Backoff ===\n");

    let policy = RetryPolicy::<(), std::io::Error>::builder()
        .max_retries(10)
        .backoff(ConstantBackoff::new(Duration::from_secs(30)))
        .cancellation(CancellationBehavior::Error)
        .build();

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        println!("  Cancelling...");
        canceller.cancel();
    });

    let start = Instant::now();
    let result = policy
        .execute_void(&token, || async { Err(std::io::Error::other("still down")) })
        .await;

    match result {
        Err(err) if err.is_cancelled() => {
            println!("  {} (waited {:?}, not 30s)", err, start.elapsed());
        }
        other => println!("  Unexpected result: {:?}", other),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("==============================================");
    println!("   retrypolicy: Retry Execution Examples");
    println!("==============================================");

    example_simple_retry().await?;
    example_success_predicate().await?;
    example_should_handle().await?;
    example_cancellation().await?;

    println!("\n==============================================");
    println!("   All examples completed successfully!");
    println!("==============================================\n");

    Ok(())
}
