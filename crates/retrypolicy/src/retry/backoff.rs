//! Backoff providers: how long to wait before the next attempt, and whether
//! to make one at all.

use std::time::Duration;

/// Supplies the delay before the next attempt.
///
/// `attempt` is 1-based: after the first attempt fails the provider is asked
/// for `next_delay(1)`, after the second `next_delay(2)`, and so on.
///
/// # Returns
/// - `Some(Duration)`: wait this long, then try again
/// - `None`: stop immediately, regardless of the remaining retry budget
///
/// The attempt budget is owned by [`RetryPolicy`](super::RetryPolicy); a
/// provider only needs to return `None` for policies that are independent of
/// attempt counting (for example a wall-clock deadline).
///
/// Any `Fn(u32) -> Option<Duration>` closure is a provider:
///
/// ```rust
/// use retrypolicy::retry::BackoffProvider;
/// use std::time::Duration;
///
/// let linear = |attempt: u32| Some(Duration::from_millis(50) * attempt);
/// assert_eq!(linear.next_delay(3), Some(Duration::from_millis(150)));
/// ```
pub trait BackoffProvider: Send + Sync {
    /// Delay before the attempt following `attempt`, or `None` to stop.
    fn next_delay(&self, attempt: u32) -> Option<Duration>;

    /// Same as [`next_delay`](Self::next_delay), with the time elapsed since
    /// the current execution started.
    ///
    /// The executor always calls this method. The default ignores `elapsed`;
    /// time-aware providers such as [`ElapsedLimit`] override it.
    fn next_delay_after(&self, attempt: u32, elapsed: Duration) -> Option<Duration> {
        let _ = elapsed;
        self.next_delay(attempt)
    }
}

impl<F> BackoffProvider for F
where
    F: Fn(u32) -> Option<Duration> + Send + Sync,
{
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        self(attempt)
    }
}

/// Waits the same amount of time before every retry and never stops on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConstantBackoff {
    delay: Duration,
}

impl ConstantBackoff {
    /// A provider that always waits `delay`.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// A provider that retries immediately. This is the default backoff of a
    /// [`RetryPolicy`](super::RetryPolicy); the executor still yields to the
    /// scheduler between attempts.
    pub fn zero() -> Self {
        Self::default()
    }

    /// The configured delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl BackoffProvider for ConstantBackoff {
    fn next_delay(&self, _attempt: u32) -> Option<Duration> {
        Some(self.delay)
    }
}

/// Exponential backoff with configurable jitter.
///
/// Delays between retries increase exponentially, capped at `max_delay`.
/// Jitter is added to prevent thundering herd problems.
///
/// # Mathematical Formula
///
/// For attempt `n` (1-based):
/// ```text
/// base_delay = initial_delay * (multiplier ^ (n - 1))
/// jitter_range = base_delay * jitter
/// final_delay = min(base_delay + random(-jitter_range, +jitter_range), max_delay)
/// ```
///
/// The provider never returns `None`; the number of attempts is governed by
/// the policy's `max_retries`.
///
/// # Examples
///
/// ```rust
/// use retrypolicy::retry::{BackoffProvider, ExponentialBackoff};
/// use std::time::Duration;
///
/// let backoff = ExponentialBackoff::builder()
///     .initial_delay(Duration::from_millis(100))
///     .max_delay(Duration::from_secs(30))
///     .multiplier(2.0)
///     .jitter(0.0)
///     .build();
///
/// assert_eq!(backoff.next_delay(1), Some(Duration::from_millis(100)));
/// assert_eq!(backoff.next_delay(3), Some(Duration::from_millis(400)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter: f64,
}

impl ExponentialBackoff {
    /// Create a new builder for configuring exponential backoff.
    pub fn builder() -> ExponentialBackoffBuilder {
        ExponentialBackoffBuilder::default()
    }

    /// Delay before the first retry.
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Upper bound on any single delay.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Growth factor applied per attempt.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Jitter factor in `[0.0, 1.0]`.
    pub fn jitter(&self) -> f64 {
        self.jitter
    }
}

impl Default for ExponentialBackoff {
    /// Defaults:
    /// - `initial_delay`: 100ms
    /// - `max_delay`: 60s
    /// - `multiplier`: 2.0 (doubles each time)
    /// - `jitter`: 0.1 (10% randomization)
    fn default() -> Self {
        ExponentialBackoffBuilder::default().build()
    }
}

impl BackoffProvider for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if self.initial_delay.is_zero() {
            return Some(Duration::ZERO);
        }
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let base_delay = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);

        // Jitter is applied as: base * jitter * random(-1.0, +1.0)
        let jittered = if self.jitter > 0.0 {
            let jitter_amount = base_delay * self.jitter * (rand::random::<f64>() - 0.5) * 2.0;
            base_delay + jitter_amount
        } else {
            base_delay
        };

        // Overflowing exponents produce inf; the cap absorbs them. Near
        // Duration::MAX the f64 cap rounds above the representable range.
        let capped = jittered.min(self.max_delay.as_secs_f64()).max(0.0);
        let delay = Duration::try_from_secs_f64(capped).unwrap_or(self.max_delay);
        Some(delay.min(self.max_delay))
    }
}

/// Builder for configuring [`ExponentialBackoff`].
///
/// ```rust
/// use retrypolicy::retry::ExponentialBackoff;
/// use std::time::Duration;
///
/// let backoff = ExponentialBackoff::builder()
///     .initial_delay(Duration::from_millis(100))
///     .max_delay(Duration::from_secs(30))
///     .multiplier(2.0)
///     .jitter(0.1)
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct ExponentialBackoffBuilder {
    initial_delay: Option<Duration>,
    max_delay: Option<Duration>,
    multiplier: Option<f64>,
    jitter: Option<f64>,
}

impl ExponentialBackoffBuilder {
    /// Set the initial delay before the first retry.
    ///
    /// Default: 100ms
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Set the maximum delay between retries.
    ///
    /// Default: 60s
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set the exponential multiplier. Values below 1.0 are raised to 1.0.
    ///
    /// Default: 2.0 (doubles each time)
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier.max(1.0));
        self
    }

    /// Set the jitter factor (0.0 to 1.0).
    ///
    /// A jitter of 0.1 means the delay can vary by ±10%.
    ///
    /// Default: 0.1
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = Some(jitter.clamp(0.0, 1.0));
        self
    }

    /// Build the `ExponentialBackoff` instance.
    ///
    /// Uses default values for any unset parameters.
    pub fn build(self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_delay: self.initial_delay.unwrap_or(Duration::from_millis(100)),
            max_delay: self.max_delay.unwrap_or(Duration::from_secs(60)),
            multiplier: self.multiplier.unwrap_or(2.0),
            jitter: self.jitter.unwrap_or(0.1),
        }
    }
}

/// Stops retrying once an execution has been running for longer than `limit`.
///
/// Wraps any other provider. The clock is per execution: the executor
/// measures elapsed time from its own first attempt, so one policy can be
/// shared by concurrent executions. Delays are clamped so that the sleep
/// never overshoots the limit.
///
/// The limit is only enforced by
/// [`next_delay_after`](BackoffProvider::next_delay_after), which is what the
/// executor calls. [`next_delay`](BackoffProvider::next_delay) has no clock
/// and returns the inner provider's delay unchanged.
///
/// ```rust
/// use retrypolicy::retry::{BackoffProvider, ConstantBackoff, ElapsedLimit};
/// use std::time::Duration;
///
/// let limited = ElapsedLimit::new(ConstantBackoff::new(Duration::from_secs(1)), Duration::from_secs(5));
///
/// assert_eq!(limited.next_delay_after(1, Duration::from_secs(2)), Some(Duration::from_secs(1)));
/// assert_eq!(limited.next_delay_after(2, Duration::from_millis(4500)), Some(Duration::from_millis(500)));
/// assert_eq!(limited.next_delay_after(3, Duration::from_secs(5)), None);
/// ```
#[derive(Debug, Clone)]
pub struct ElapsedLimit<B> {
    inner: B,
    limit: Duration,
}

impl<B: BackoffProvider> ElapsedLimit<B> {
    /// Wrap `inner`, stopping once `limit` has elapsed.
    pub fn new(inner: B, limit: Duration) -> Self {
        Self { inner, limit }
    }

    /// The wall-clock budget.
    pub fn limit(&self) -> Duration {
        self.limit
    }
}

impl<B: BackoffProvider> BackoffProvider for ElapsedLimit<B> {
    /// Delegates to the inner provider without applying the limit.
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        self.inner.next_delay(attempt)
    }

    fn next_delay_after(&self, attempt: u32, elapsed: Duration) -> Option<Duration> {
        if elapsed >= self.limit {
            return None;
        }
        let delay = self.inner.next_delay_after(attempt, elapsed)?;
        Some(delay.min(self.limit - elapsed))
    }
}
