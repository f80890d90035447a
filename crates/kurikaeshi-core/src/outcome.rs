//! Attempt outcomes, attempt records and retry decisions.

use crate::error::StepError;
use std::time::Duration;

/// Classified result of an attempt, or the terminal result of a step run.
///
/// The classifier only ever produces the first three variants.
/// [`Cancelled`](Outcome::Cancelled) is reserved for the executor when a host
/// aborts a pending retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The attempt produced a value.
    Success(T),
    /// The attempt failed in a way that may succeed if retried.
    RetryableFailure(StepError),
    /// The attempt failed and retrying will not help.
    FatalFailure(StepError),
    /// The host cancelled a pending retry.
    Cancelled,
}

impl<T> Outcome<T> {
    /// Returns the kind of this outcome without its payload.
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Success(_) => OutcomeKind::Success,
            Outcome::RetryableFailure(_) => OutcomeKind::RetryableFailure,
            Outcome::FatalFailure(_) => OutcomeKind::FatalFailure,
            Outcome::Cancelled => OutcomeKind::Cancelled,
        }
    }

    /// Returns `true` if this is [`Outcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Returns the failure reason, if any.
    pub fn error(&self) -> Option<&StepError> {
        match self {
            Outcome::RetryableFailure(e) | Outcome::FatalFailure(e) => Some(e),
            Outcome::Success(_) | Outcome::Cancelled => None,
        }
    }

    /// Returns the success value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Success(v) => Some(v),
            _ => None,
        }
    }

    /// Consumes the outcome and returns the success value, if any.
    pub fn into_value(self) -> Option<T> {
        match self {
            Outcome::Success(v) => Some(v),
            _ => None,
        }
    }
}

/// Payload-free tag of an [`Outcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    /// See [`Outcome::Success`].
    Success,
    /// See [`Outcome::RetryableFailure`].
    RetryableFailure,
    /// See [`Outcome::FatalFailure`].
    FatalFailure,
    /// See [`Outcome::Cancelled`].
    Cancelled,
}

impl OutcomeKind {
    /// Returns `true` if no further attempt may follow an outcome of this kind.
    pub fn is_terminal(self) -> bool {
        !matches!(self, OutcomeKind::RetryableFailure)
    }
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeKind::Success => write!(f, "success"),
            OutcomeKind::RetryableFailure => write!(f, "retryable_failure"),
            OutcomeKind::FatalFailure => write!(f, "fatal_failure"),
            OutcomeKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// One physical execution of a step.
///
/// Attempts are created once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    number: u32,
    kind: OutcomeKind,
    elapsed: Duration,
    error: Option<StepError>,
}

impl Attempt {
    /// Records attempt `number` (1-based) from its classified outcome.
    pub fn record<T>(number: u32, outcome: &Outcome<T>, elapsed: Duration) -> Self {
        Self {
            number,
            kind: outcome.kind(),
            elapsed,
            error: outcome.error().cloned(),
        }
    }

    /// 1-based sequence number.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// How the attempt was classified.
    pub fn kind(&self) -> OutcomeKind {
        self.kind
    }

    /// Wall-clock time the attempt took.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// The error the attempt failed with.
    pub fn error(&self) -> Option<&StepError> {
        self.error.as_ref()
    }
}

/// What to do after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Attempt again after the given delay.
    Retry(Duration),
    /// Stop and report the last outcome.
    GiveUp,
}
