//! Error types raised by steps, hooks and backoff configuration.

use crate::step::StepName;
use std::time::Duration;
use thiserror::Error;

/// The type of lifecycle hook that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookType {
    /// The attempt observer hook.
    OnAttempt,
    /// The failure capture hook.
    OnFatalFailure,
}

impl std::fmt::Display for HookType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookType::OnAttempt => write!(f, "on_attempt"),
            HookType::OnFatalFailure => write!(f, "on_fatal_failure"),
        }
    }
}

/// Errors a step can fail with.
///
/// The variant decides how the default classifier treats the failure:
/// [`Timeout`](StepError::Timeout), [`ConnectionReset`](StepError::ConnectionReset)
/// and [`Retryable`](StepError::Retryable) are transient, everything else is fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepError {
    /// The attempt did not finish within the request timeout.
    #[error("Timed out after {}ms", .after.as_millis())]
    Timeout {
        /// The timeout that was exceeded.
        after: Duration,
    },

    /// The peer dropped the connection.
    #[error("Connection reset: {0}")]
    ConnectionReset(String),

    /// Explicitly marked as safe to retry.
    #[error("Retryable failure: {0}")]
    Retryable(String),

    /// The response carried an unexpected HTTP status.
    #[error("Expected status {expected}, got {actual}")]
    UnexpectedStatus {
        /// Status the step expected.
        expected: u16,
        /// Status the response carried.
        actual: u16,
    },

    /// A response assertion did not hold.
    #[error("Assertion failed: {0}")]
    Assertion(String),

    /// Any other failure.
    #[error("Step failed: {0}")]
    Failed(String),

    /// The step panicked while running.
    #[error("Step panicked: {0}")]
    Panicked(String),
}

impl StepError {
    /// Shorthand for [`StepError::Failed`].
    pub fn failed(details: impl Into<String>) -> Self {
        Self::Failed(details.into())
    }

    /// Shorthand for [`StepError::Retryable`].
    pub fn retryable(details: impl Into<String>) -> Self {
        Self::Retryable(details.into())
    }

    /// Shorthand for [`StepError::Assertion`].
    pub fn assertion(details: impl Into<String>) -> Self {
        Self::Assertion(details.into())
    }

    /// Returns `true` for network-timeout-like failures and explicit retry markers.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StepError::Timeout { .. } | StepError::ConnectionReset(_) | StepError::Retryable(_)
        )
    }
}

/// A lifecycle hook failed.
///
/// Hook failures are logged by the executor and never change a step's outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Hook '{hook_type}' failed in step '{step_name}': {details}")]
pub struct HookError {
    /// The name of the step whose hook failed.
    pub step_name: StepName,
    /// Which hook failed.
    pub hook_type: HookType,
    /// Details about the failure.
    pub details: String,
}

impl HookError {
    /// Creates a new hook error.
    pub fn new(step_name: StepName, hook_type: HookType, details: impl Into<String>) -> Self {
        Self {
            step_name,
            hook_type,
            details: details.into(),
        }
    }
}

/// Error returned when backoff parameters are invalid.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid backoff: {0}")]
pub struct BackoffError(pub &'static str);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = StepError::Timeout {
            after: Duration::from_millis(10_000),
        };
        assert_eq!(error.to_string(), "Timed out after 10000ms");

        let error = StepError::UnexpectedStatus {
            expected: 200,
            actual: 503,
        };
        assert_eq!(error.to_string(), "Expected status 200, got 503");
    }

    #[test]
    fn test_transient_errors() {
        assert!(StepError::Timeout {
            after: Duration::from_secs(1)
        }
        .is_transient());
        assert!(StepError::ConnectionReset("peer closed".into()).is_transient());
        assert!(StepError::retryable("try again").is_transient());

        assert!(!StepError::failed("boom").is_transient());
        assert!(!StepError::assertion("missing key").is_transient());
        assert!(!StepError::Panicked("oops".into()).is_transient());
    }

    #[test]
    fn test_hook_error_display() {
        let error = HookError::new(
            StepName::new("login"),
            HookType::OnFatalFailure,
            "capture failed",
        );
        assert_eq!(
            error.to_string(),
            "Hook 'on_fatal_failure' failed in step 'login': capture failed"
        );
        assert_eq!(HookType::OnAttempt.to_string(), "on_attempt");
    }
}
