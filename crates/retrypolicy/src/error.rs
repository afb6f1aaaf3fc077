//! Error types returned by the retry engine.

use thiserror::Error;

/// Error returned by [`RetryPolicy::execute`](crate::RetryPolicy::execute) and
/// [`RetryPolicy::execute_void`](crate::RetryPolicy::execute_void).
///
/// With the default policy settings the only variant ever produced is
/// [`RetryError::Operation`], carrying the error of the most recent attempt
/// unchanged. The other variants are opt-in via
/// [`CancellationBehavior`](crate::CancellationBehavior) and
/// [`ExhaustionBehavior`](crate::ExhaustionBehavior).
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The operation failed and the loop stopped (not retry-worthy, budget
    /// exhausted, backoff stopped, or cancelled under the default behavior).
    #[error(transparent)]
    Operation(E),

    /// The execution was cancelled before an acceptable outcome was produced.
    #[error("retry cancelled after {attempts} attempt(s)")]
    Cancelled {
        /// Number of operation invocations made.
        attempts: u32,
        /// Error of the last attempt, if it failed.
        last_error: Option<E>,
    },

    /// The retry budget ran out while every successful value was still
    /// rejected by the success predicates.
    #[error("retry budget exhausted after {attempts} attempt(s) without an accepted value")]
    Exhausted {
        /// Number of operation invocations made.
        attempts: u32,
    },
}

impl<E> RetryError<E> {
    /// Borrow the operation error, if one was observed.
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            RetryError::Operation(err) => Some(err),
            RetryError::Cancelled { last_error, .. } => last_error.as_ref(),
            RetryError::Exhausted { .. } => None,
        }
    }

    /// Take the operation error, if one was observed.
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            RetryError::Operation(err) => Some(err),
            RetryError::Cancelled { last_error, .. } => last_error,
            RetryError::Exhausted { .. } => None,
        }
    }

    /// Returns `true` for [`RetryError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }

    /// Returns `true` for [`RetryError::Exhausted`].
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }
}
