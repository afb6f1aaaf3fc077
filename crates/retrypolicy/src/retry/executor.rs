//! The retry loop shared by `execute` and `execute_void`.

use super::classifier::{Outcome, OutcomeClassifier, ResultClassifier, VoidClassifier};
use super::policy::{CancellationBehavior, ExhaustionBehavior, RetryPolicy};
use crate::error::RetryError;
use std::future::Future;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

impl<T, E> RetryPolicy<T, E> {
    /// Run a value-returning operation under this policy.
    ///
    /// The operation is invoked until its outcome is acceptable, the retry
    /// budget is exhausted, the backoff provider stops, or `token` is
    /// cancelled. Errors are classified with `should_handle`; successful
    /// values with the success predicates.
    ///
    /// Cancellation is cooperative: an attempt that is already running is
    /// never interrupted, but a pending backoff sleep is.
    ///
    /// # Returns
    /// - `Ok(T)`: the last value produced. With the default
    ///   [`ExhaustionBehavior`] this includes a value still rejected by the
    ///   predicates when the budget ran out
    /// - `Err(RetryError::Operation(E))`: the error of the last attempt
    ///
    /// # Examples
    ///
    /// ```rust
    /// use retrypolicy::{CancellationToken, RetryPolicy};
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicU32, Ordering};
    ///
    /// # async fn example() {
    /// let policy = RetryPolicy::<u32, std::io::Error>::builder()
    ///     .max_retries(5)
    ///     .success_predicates([|status: &u32| *status == 503])
    ///     .build();
    ///
    /// let calls = Arc::new(AtomicU32::new(0));
    /// let status = policy
    ///     .execute(&CancellationToken::new(), || {
    ///         let calls = Arc::clone(&calls);
    ///         async move {
    ///             let n = calls.fetch_add(1, Ordering::SeqCst);
    ///             Ok::<_, std::io::Error>(if n < 2 { 503 } else { 200 })
    ///         }
    ///     })
    ///     .await;
    ///
    /// assert_eq!(status.unwrap(), 200);
    /// assert_eq!(calls.load(Ordering::SeqCst), 3);
    /// # }
    /// ```
    pub async fn execute<F, Fut>(
        &self,
        token: &CancellationToken,
        operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let classifier = ResultClassifier::new(self.should_handle.as_ref(), &self.success_predicates);
        self.run(token, &classifier, operation).await
    }

    /// Run an operation that has no meaningful result under this policy.
    ///
    /// Identical to [`execute`](Self::execute) except that `Ok(())` always
    /// ends the execution: success predicates are never evaluated.
    pub async fn execute_void<F, Fut>(
        &self,
        token: &CancellationToken,
        operation: F,
    ) -> Result<(), RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let classifier = VoidClassifier::new(self.should_handle.as_ref());
        self.run(token, &classifier, operation).await
    }

    async fn run<U, C, F, Fut>(
        &self,
        token: &CancellationToken,
        classifier: &C,
        mut operation: F,
    ) -> Result<U, RetryError<E>>
    where
        C: OutcomeClassifier<U, E>,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<U, E>>,
    {
        let started = Instant::now();
        let mut retry_count: u32 = 0;

        loop {
            let outcome = Outcome::from(operation().await);
            let attempts = retry_count.saturating_add(1);

            if !classifier.is_retry_worthy(&outcome) {
                return settle(outcome);
            }

            if retry_count >= self.max_retries {
                return self.exhausted(outcome, attempts);
            }

            if token.is_cancelled() {
                debug!(attempts, "Retry loop cancelled");
                return self.cancelled(outcome, attempts);
            }

            let Some(delay) = self
                .backoff
                .next_delay_after(retry_count + 1, started.elapsed())
            else {
                debug!(attempts, "Backoff provider stopped retrying");
                return settle(outcome);
            };

            retry_count += 1;
            (self.on_retry)(outcome.error(), retry_count);

            debug!(
                retry = retry_count,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                failed = outcome.is_failure(),
                "Retrying operation"
            );

            // Yield even on zero delay to avoid a busy loop
            if delay.is_zero() {
                tokio::task::yield_now().await;
                if token.is_cancelled() {
                    debug!(attempts, "Retry loop cancelled");
                    return self.cancelled(outcome, attempts);
                }
                continue;
            }

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = token.cancelled() => {
                    debug!(attempts, "Retry loop cancelled during backoff");
                    return self.cancelled(outcome, attempts);
                }
            }
        }
    }

    fn exhausted<U>(&self, outcome: Outcome<U, E>, attempts: u32) -> Result<U, RetryError<E>> {
        match outcome {
            Outcome::Failure(err) => {
                warn!(attempts, "Retry budget exhausted");
                Err(RetryError::Operation(err))
            }
            Outcome::Success(value) => match self.exhaustion {
                ExhaustionBehavior::ReturnLastOutcome => Ok(value),
                ExhaustionBehavior::Reject => {
                    warn!(attempts, "Retry budget exhausted without an accepted value");
                    Err(RetryError::Exhausted { attempts })
                }
            },
        }
    }

    fn cancelled<U>(&self, outcome: Outcome<U, E>, attempts: u32) -> Result<U, RetryError<E>> {
        match self.cancellation {
            CancellationBehavior::ReturnLastOutcome => settle(outcome),
            CancellationBehavior::Error => Err(RetryError::Cancelled {
                attempts,
                last_error: outcome.into_result().err(),
            }),
        }
    }
}

fn settle<U, E>(outcome: Outcome<U, E>) -> Result<U, RetryError<E>> {
    outcome.into_result().map_err(RetryError::Operation)
}
