#![deny(unsafe_code)]
#![warn(missing_docs)]

//! A configurable retry execution engine.
//!
//! This crate runs a fallible async operation under a [`RetryPolicy`] and
//! decides, per attempt, whether to try again, how long to wait, and when to
//! give up:
//!
//! - **Outcome classification** via [`retry::OutcomeClassifier`]
//!   - errors are filtered with a `should_handle` predicate
//!   - successful values can still be rejected by success predicates
//! - **Pluggable backoff** via the [`BackoffProvider`] trait
//!   - constant, exponential with jitter, and wall-clock limited providers
//!   - any `Fn(u32) -> Option<Duration>` closure
//! - **Observability hooks** via the `on_retry` callback and `tracing` events
//! - **Cooperative cancellation** via [`CancellationToken`]
//!
//! # Examples
//!
//! Using the prelude for convenient imports:
//!
//! ```rust
//! use retrypolicy::prelude::*;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), RetryError<std::io::Error>> {
//! let policy = RetryPolicy::<u32, std::io::Error>::builder()
//!     .max_retries(3)
//!     .accept_any_success()
//!     .backoff(ExponentialBackoff::builder().initial_delay(Duration::from_millis(100)).build())
//!     .build();
//!
//! let token = CancellationToken::new();
//! let value = policy
//!     .execute(&token, || async { Ok::<_, std::io::Error>(42) })
//!     .await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod retry;

pub use config::{BackoffSettings, ConfigError, RetrySettings};
pub use error::RetryError;
pub use retry::{
    BackoffProvider, CancellationBehavior, ExhaustionBehavior, RetryPolicy, RetryPolicyBuilder,
    default_policy,
};
pub use tokio_util::sync::CancellationToken;

/// Convenient re-exports of commonly used items.
///
/// ```rust
/// use retrypolicy::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{BackoffSettings, RetrySettings};
    pub use crate::error::RetryError;
    pub use crate::retry::{
        BackoffProvider, CancellationBehavior, ConstantBackoff, ElapsedLimit,
        ExhaustionBehavior, ExponentialBackoff, ExponentialBackoffBuilder, RetryPolicy,
        RetryPolicyBuilder, default_policy,
    };
    pub use tokio_util::sync::CancellationToken;
}
