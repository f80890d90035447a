//! Turns raw step results into classified outcomes.

use crate::error::StepError;
use crate::outcome::Outcome;
use std::fmt;
use std::sync::Arc;

type RetryPredicate = dyn Fn(&StepError) -> bool + Send + Sync;

/// Classifies step results as success, retryable failure or fatal failure.
///
/// The boundary between retryable and fatal is a predicate over
/// [`StepError`]. The default one is [`StepError::is_transient`].
///
/// # Examples
///
/// ```
/// use kurikaeshi_core::{Outcome, OutcomeClassifier, StepError};
///
/// let classifier = OutcomeClassifier::default();
/// let outcome = classifier.classify::<()>(Err(StepError::retryable("busy")));
/// assert!(matches!(outcome, Outcome::RetryableFailure(_)));
///
/// // Treat every failure as retryable.
/// let classifier = OutcomeClassifier::with_predicate(|_| true);
/// let outcome = classifier.classify::<()>(Err(StepError::failed("boom")));
/// assert!(matches!(outcome, Outcome::RetryableFailure(_)));
/// ```
#[derive(Clone)]
pub struct OutcomeClassifier {
    is_retryable: Arc<RetryPredicate>,
}

impl fmt::Debug for OutcomeClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutcomeClassifier")
            .field("is_retryable", &"<predicate>")
            .finish()
    }
}

impl Default for OutcomeClassifier {
    fn default() -> Self {
        Self::with_predicate(StepError::is_transient)
    }
}

impl OutcomeClassifier {
    /// Creates a classifier with a custom retryable predicate.
    pub fn with_predicate<F>(predicate: F) -> Self
    where
        F: Fn(&StepError) -> bool + Send + Sync + 'static,
    {
        Self {
            is_retryable: Arc::new(predicate),
        }
    }

    /// Returns `true` if `error` should be retried.
    pub fn is_retryable(&self, error: &StepError) -> bool {
        (self.is_retryable)(error)
    }

    /// Classifies the result of one attempt.
    pub fn classify<T>(&self, result: Result<T, StepError>) -> Outcome<T> {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(error) if self.is_retryable(&error) => Outcome::RetryableFailure(error),
            Err(error) => Outcome::FatalFailure(error),
        }
    }
}
