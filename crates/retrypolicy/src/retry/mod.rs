//! Retry orchestration, outcome classification and backoff providers.
//!
//! # Key Types
//!
//! - [`RetryPolicy`] - Immutable retry configuration and the `execute*` entry points
//! - [`OutcomeClassifier`] - Decides whether an attempt's outcome is retry-worthy
//! - [`BackoffProvider`] - Supplies the delay before the next attempt, or stops the loop
//!
//! # Examples
//!
//! ```rust
//! use retrypolicy::retry::{ConstantBackoff, RetryPolicy};
//! use retrypolicy::CancellationToken;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let policy = RetryPolicy::<(), std::io::Error>::builder()
//!     .max_retries(2)
//!     .backoff(ConstantBackoff::new(Duration::from_millis(10)))
//!     .build();
//!
//! let result = policy
//!     .execute_void(&CancellationToken::new(), || async {
//!         Err(std::io::Error::other("unavailable"))
//!     })
//!     .await;
//! assert!(result.is_err());
//! # }
//! ```

mod backoff;
mod classifier;
mod executor;
mod policy;

pub use backoff::{
    BackoffProvider, ConstantBackoff, ElapsedLimit, ExponentialBackoff, ExponentialBackoffBuilder,
};
pub use classifier::{
    ErrorPredicate, Outcome, OutcomeClassifier, ResultClassifier, SuccessPredicate,
    VoidClassifier,
};
pub use policy::{
    CancellationBehavior, ExhaustionBehavior, RetryCallback, RetryPolicy, RetryPolicyBuilder,
    default_policy,
};
