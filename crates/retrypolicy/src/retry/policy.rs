//! Immutable retry configuration and its builder.

use super::backoff::{BackoffProvider, ConstantBackoff};
use super::classifier::{ErrorPredicate, SuccessPredicate};
use crate::config::RetrySettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Callback fired once per retry taken.
///
/// Receives the error that triggered the retry (`None` when a rejected
/// success triggered it) and the 1-based retry counter.
pub type RetryCallback<E> = Arc<dyn Fn(Option<&E>, u32) + Send + Sync>;

/// What an execution returns when its cancellation token fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationBehavior {
    /// Return the outcome of the last attempt unchanged.
    #[default]
    ReturnLastOutcome,
    /// Return [`RetryError::Cancelled`](crate::RetryError::Cancelled).
    Error,
}

/// What an execution returns when the retry budget runs out on a success
/// that the success predicates still reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionBehavior {
    /// Return the last value as `Ok`.
    #[default]
    ReturnLastOutcome,
    /// Return [`RetryError::Exhausted`](crate::RetryError::Exhausted).
    Reject,
}

/// Retry configuration for operations returning `Result<T, E>`.
///
/// A policy is immutable once built. It can be shared by reference or cloned
/// cheaply (all callbacks are reference counted) and used by any number of
/// concurrent executions; each execution keeps its own attempt counter.
///
/// # Defaults
///
/// - `should_handle`: every error is retry-worthy
/// - success predicates: one predicate that rejects every value, so even
///   successful results are retried until the budget runs out. Use
///   [`RetryPolicyBuilder::accept_any_success`] or
///   [`RetryPolicyBuilder::success_predicates`] to opt out.
/// - `max_retries`: 1 (two attempts in total)
/// - `on_retry`: no-op
/// - backoff: [`ConstantBackoff::zero`]
/// - cancellation / exhaustion: return the last outcome
///
/// # Examples
///
/// ```rust
/// use retrypolicy::RetryPolicy;
///
/// let policy = RetryPolicy::<String, std::io::Error>::builder()
///     .max_retries(5)
///     .should_handle(|err| err.kind() != std::io::ErrorKind::PermissionDenied)
///     .success_predicates([|body: &String| body.is_empty()])
///     .on_retry(|err, retry| eprintln!("retry {retry} after {err:?}"))
///     .build();
///
/// assert_eq!(policy.max_retries(), 5);
/// ```
pub struct RetryPolicy<T, E> {
    pub(super) should_handle: ErrorPredicate<E>,
    pub(super) success_predicates: Vec<SuccessPredicate<T>>,
    pub(super) max_retries: u32,
    pub(super) on_retry: RetryCallback<E>,
    pub(super) backoff: Arc<dyn BackoffProvider>,
    pub(super) cancellation: CancellationBehavior,
    pub(super) exhaustion: ExhaustionBehavior,
}

/// Build a fresh policy with the library defaults.
///
/// Every call returns a new value; customising one policy never affects
/// another.
pub fn default_policy<T, E>() -> RetryPolicy<T, E> {
    RetryPolicy {
        should_handle: Arc::new(|_: &E| true),
        success_predicates: vec![Arc::new(|_: &T| true)],
        max_retries: 1,
        on_retry: Arc::new(|_: Option<&E>, _: u32| {}),
        backoff: Arc::new(ConstantBackoff::zero()),
        cancellation: CancellationBehavior::default(),
        exhaustion: ExhaustionBehavior::default(),
    }
}

impl<T, E> RetryPolicy<T, E> {
    /// Create a builder seeded with the library defaults.
    pub fn builder() -> RetryPolicyBuilder<T, E> {
        RetryPolicyBuilder {
            policy: default_policy(),
        }
    }

    /// Create a builder seeded with this policy, leaving `self` untouched.
    pub fn to_builder(&self) -> RetryPolicyBuilder<T, E> {
        RetryPolicyBuilder {
            policy: self.clone(),
        }
    }

    /// Maximum number of retries; total attempts are `max_retries + 1`.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Number of configured success predicates.
    pub fn success_predicate_count(&self) -> usize {
        self.success_predicates.len()
    }

    /// Behavior on cancellation.
    pub fn cancellation(&self) -> CancellationBehavior {
        self.cancellation
    }

    /// Behavior when the budget runs out on a rejected success.
    pub fn exhaustion(&self) -> ExhaustionBehavior {
        self.exhaustion
    }

    /// The backoff provider.
    pub fn backoff(&self) -> &dyn BackoffProvider {
        self.backoff.as_ref()
    }
}

impl<T, E> Default for RetryPolicy<T, E> {
    fn default() -> Self {
        default_policy()
    }
}

impl<T, E> Clone for RetryPolicy<T, E> {
    fn clone(&self) -> Self {
        Self {
            should_handle: Arc::clone(&self.should_handle),
            success_predicates: self.success_predicates.clone(),
            max_retries: self.max_retries,
            on_retry: Arc::clone(&self.on_retry),
            backoff: Arc::clone(&self.backoff),
            cancellation: self.cancellation,
            exhaustion: self.exhaustion,
        }
    }
}

impl<T, E> fmt::Debug for RetryPolicy<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("success_predicates", &self.success_predicates.len())
            .field("cancellation", &self.cancellation)
            .field("exhaustion", &self.exhaustion)
            .finish_non_exhaustive()
    }
}

/// Builder for [`RetryPolicy`].
pub struct RetryPolicyBuilder<T, E> {
    policy: RetryPolicy<T, E>,
}

impl<T, E> RetryPolicyBuilder<T, E> {
    /// Set the maximum number of retries after the first attempt.
    ///
    /// `0` means exactly one attempt. Default: 1
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.policy.max_retries = max_retries;
        self
    }

    /// Decide which errors are retry-worthy.
    ///
    /// Default: every error.
    pub fn should_handle<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.policy.should_handle = Arc::new(predicate);
        self
    }

    /// Replace the success predicates.
    ///
    /// Each predicate returns `true` if the value is still unacceptable. A
    /// success is retried if any predicate returns `true`. Only the
    /// value-returning [`execute`](RetryPolicy::execute) evaluates them.
    pub fn success_predicates<I, P>(mut self, predicates: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.policy.success_predicates = predicates
            .into_iter()
            .map(|p| Arc::new(p) as SuccessPredicate<T>)
            .collect();
        self
    }

    /// Append one success predicate to the current set.
    pub fn add_success_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.policy.success_predicates.push(Arc::new(predicate));
        self
    }

    /// Remove all success predicates so that any successful value ends the
    /// execution.
    pub fn accept_any_success(mut self) -> Self {
        self.policy.success_predicates.clear();
        self
    }

    /// Set the callback fired once per retry taken.
    pub fn on_retry<F>(mut self, callback: F) -> Self
    where
        F: Fn(Option<&E>, u32) + Send + Sync + 'static,
    {
        self.policy.on_retry = Arc::new(callback);
        self
    }

    /// Set the backoff provider.
    pub fn backoff<B>(mut self, backoff: B) -> Self
    where
        B: BackoffProvider + 'static,
    {
        self.policy.backoff = Arc::new(backoff);
        self
    }

    /// Set an already shared backoff provider.
    pub fn shared_backoff(mut self, backoff: Arc<dyn BackoffProvider>) -> Self {
        self.policy.backoff = backoff;
        self
    }

    /// Choose what cancellation returns.
    pub fn cancellation(mut self, behavior: CancellationBehavior) -> Self {
        self.policy.cancellation = behavior;
        self
    }

    /// Choose what a budget exhausted on a rejected success returns.
    pub fn exhaustion(mut self, behavior: ExhaustionBehavior) -> Self {
        self.policy.exhaustion = behavior;
        self
    }

    /// Apply loaded settings: budget, backoff, cancellation and exhaustion
    /// behavior. Predicates and the callback are left untouched.
    pub fn settings(self, settings: &RetrySettings) -> Self {
        self.max_retries(settings.max_retries)
            .shared_backoff(settings.backoff_provider())
            .cancellation(settings.cancellation)
            .exhaustion(settings.exhaustion)
    }

    /// Build the policy.
    pub fn build(self) -> RetryPolicy<T, E> {
        self.policy
    }
}

impl<T, E> fmt::Debug for RetryPolicyBuilder<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicyBuilder")
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_policy() {
        let policy: RetryPolicy<u32, std::io::Error> = default_policy();

        assert_eq!(policy.max_retries(), 1);
        assert_eq!(policy.success_predicate_count(), 1);
        assert!((policy.success_predicates[0])(&0));
        assert!((policy.should_handle)(&std::io::Error::other("any")));
        assert_eq!(policy.cancellation(), CancellationBehavior::ReturnLastOutcome);
        assert_eq!(policy.exhaustion(), ExhaustionBehavior::ReturnLastOutcome);
        assert_eq!(policy.backoff().next_delay(1), Some(Duration::ZERO));
    }

    #[test]
    fn test_default_policies_are_independent() {
        let customised: RetryPolicy<u32, String> = RetryPolicy::builder()
            .max_retries(9)
            .accept_any_success()
            .build();
        let fresh: RetryPolicy<u32, String> = RetryPolicy::default();

        assert_eq!(customised.max_retries(), 9);
        assert_eq!(customised.success_predicate_count(), 0);
        assert_eq!(fresh.max_retries(), 1);
        assert_eq!(fresh.success_predicate_count(), 1);
    }

    #[test]
    fn test_to_builder_leaves_template_untouched() {
        let template: RetryPolicy<u32, String> = RetryPolicy::builder().max_retries(3).build();
        let derived = template
            .to_builder()
            .max_retries(7)
            .add_success_predicate(|v| *v == 0)
            .build();

        assert_eq!(template.max_retries(), 3);
        assert_eq!(template.success_predicate_count(), 1);
        assert_eq!(derived.max_retries(), 7);
        assert_eq!(derived.success_predicate_count(), 2);
    }

    #[test]
    fn test_success_predicates_replace() {
        let policy: RetryPolicy<u32, String> = RetryPolicy::builder()
            .success_predicates([|v: &u32| *v < 10])
            .add_success_predicate(|v| *v > 100)
            .build();

        assert_eq!(policy.success_predicate_count(), 2);
        assert!(!(policy.success_predicates[0])(&50));
        assert!((policy.success_predicates[1])(&500));
    }

    #[test]
    fn test_settings_applied() {
        let settings = RetrySettings {
            max_retries: 4,
            cancellation: CancellationBehavior::Error,
            exhaustion: ExhaustionBehavior::Reject,
            ..Default::default()
        };
        let policy: RetryPolicy<(), String> = RetryPolicy::builder().settings(&settings).build();

        assert_eq!(policy.max_retries(), 4);
        assert_eq!(policy.cancellation(), CancellationBehavior::Error);
        assert_eq!(policy.exhaustion(), ExhaustionBehavior::Reject);
    }

    #[test]
    fn test_debug_output() {
        let policy: RetryPolicy<u32, String> = RetryPolicy::default();
        let debug = format!("{:?}", policy);

        assert!(debug.contains("max_retries: 1"));
        assert!(debug.contains("success_predicates: 1"));
    }
}
