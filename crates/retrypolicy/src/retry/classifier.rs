//! Outcome classification: deciding whether an attempt should be retried.

use std::sync::Arc;

/// Predicate over an operation error. Returns `true` if the error is retry-worthy.
pub type ErrorPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Predicate over a successful value. Returns `true` if the value is still
/// unacceptable and another attempt should be made.
pub type SuccessPredicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// The result of a single invocation of the user operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T, E> {
    /// The operation returned a value.
    Success(T),
    /// The operation returned an error.
    Failure(E),
}

impl<T, E> Outcome<T, E> {
    /// Borrow the error, if this is a failure.
    pub fn error(&self) -> Option<&E> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(err) => Some(err),
        }
    }

    /// Returns `true` for [`Outcome::Failure`].
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    /// Convert back into a plain `Result`.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(err) => Err(err),
        }
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(err) => Outcome::Failure(err),
        }
    }
}

/// Strategy deciding whether an outcome warrants another attempt.
///
/// The retry loop is shared between the value-returning and the void entry
/// points; each entry point supplies its own classifier.
pub trait OutcomeClassifier<T, E> {
    /// Returns `true` if the outcome is retry-worthy.
    fn is_retry_worthy(&self, outcome: &Outcome<T, E>) -> bool;
}

/// Classifier for value-returning operations.
///
/// Failures are passed to `should_handle`. Successes are retried if any
/// success predicate still rejects the value; predicates are evaluated in
/// order and short-circuit on the first `true`. An empty predicate set
/// accepts every value.
pub struct ResultClassifier<'a, T, E> {
    should_handle: &'a (dyn Fn(&E) -> bool + Send + Sync),
    predicates: &'a [SuccessPredicate<T>],
}

impl<'a, T, E> ResultClassifier<'a, T, E> {
    /// Create a classifier from an error predicate and success predicates.
    pub fn new(
        should_handle: &'a (dyn Fn(&E) -> bool + Send + Sync),
        predicates: &'a [SuccessPredicate<T>],
    ) -> Self {
        Self {
            should_handle,
            predicates,
        }
    }
}

impl<T, E> OutcomeClassifier<T, E> for ResultClassifier<'_, T, E> {
    fn is_retry_worthy(&self, outcome: &Outcome<T, E>) -> bool {
        match outcome {
            Outcome::Failure(err) => (self.should_handle)(err),
            Outcome::Success(value) => self.predicates.iter().any(|rejects| rejects(value)),
        }
    }
}

/// Classifier for operations with no meaningful result.
///
/// A successful outcome is always final; success predicates are never
/// consulted.
pub struct VoidClassifier<'a, E> {
    should_handle: &'a (dyn Fn(&E) -> bool + Send + Sync),
}

impl<'a, E> VoidClassifier<'a, E> {
    /// Create a classifier from an error predicate.
    pub fn new(should_handle: &'a (dyn Fn(&E) -> bool + Send + Sync)) -> Self {
        Self { should_handle }
    }
}

impl<E> OutcomeClassifier<(), E> for VoidClassifier<'_, E> {
    fn is_retry_worthy(&self, outcome: &Outcome<(), E>) -> bool {
        match outcome {
            Outcome::Failure(err) => (self.should_handle)(err),
            Outcome::Success(()) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn always(_: &std::io::Error) -> bool {
        true
    }

    #[test]
    fn test_failure_uses_should_handle() {
        let only_timeouts = |err: &std::io::Error| err.kind() == std::io::ErrorKind::TimedOut;
        let classifier = ResultClassifier::<u32, std::io::Error>::new(&only_timeouts, &[]);

        let timeout = Outcome::Failure(std::io::Error::from(std::io::ErrorKind::TimedOut));
        let denied = Outcome::Failure(std::io::Error::from(std::io::ErrorKind::PermissionDenied));

        assert!(classifier.is_retry_worthy(&timeout));
        assert!(!classifier.is_retry_worthy(&denied));
    }

    #[test]
    fn test_success_retried_when_any_predicate_rejects() {
        let predicates: Vec<SuccessPredicate<u32>> =
            vec![Arc::new(|v: &u32| *v == 0), Arc::new(|v: &u32| *v > 100)];
        let classifier = ResultClassifier::<u32, std::io::Error>::new(&always, &predicates);

        assert!(classifier.is_retry_worthy(&Outcome::Success(0)));
        assert!(classifier.is_retry_worthy(&Outcome::Success(500)));
        assert!(!classifier.is_retry_worthy(&Outcome::Success(42)));
    }

    #[test]
    fn test_empty_predicates_accept_any_success() {
        let classifier = ResultClassifier::<&str, std::io::Error>::new(&always, &[]);
        assert!(!classifier.is_retry_worthy(&Outcome::Success("anything")));
    }

    #[test]
    fn test_predicates_short_circuit() {
        let calls = Arc::new(AtomicU32::new(0));
        let counted = Arc::clone(&calls);
        let predicates: Vec<SuccessPredicate<u32>> = vec![
            Arc::new(|_: &u32| true),
            Arc::new(move |_: &u32| {
                counted.fetch_add(1, Ordering::SeqCst);
                true
            }),
        ];
        let classifier = ResultClassifier::<u32, std::io::Error>::new(&always, &predicates);

        assert!(classifier.is_retry_worthy(&Outcome::Success(1)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_void_success_is_final() {
        let classifier = VoidClassifier::<std::io::Error>::new(&always);

        assert!(!classifier.is_retry_worthy(&Outcome::Success(())));
        assert!(classifier.is_retry_worthy(&Outcome::Failure(std::io::Error::other("boom"))));
    }

    #[test]
    fn test_outcome_conversions() {
        let ok: Outcome<u32, String> = Ok(7).into();
        let err: Outcome<u32, String> = Err("bad".to_string()).into();

        assert!(!ok.is_failure());
        assert_eq!(ok.error(), None);
        assert_eq!(err.error().map(String::as_str), Some("bad"));
        assert_eq!(ok.into_result(), Ok(7));
        assert_eq!(err.into_result(), Err("bad".to_string()));
    }
}
