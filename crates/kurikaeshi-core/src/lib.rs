//! Core traits and types for the kurikaeshi step-retry engine.
//!
//! This crate provides the retry model without runtime dependencies.
//! Test-helper authors should depend on this crate to implement custom steps
//! and hooks.
//!
//! # Core Types
//!
//! - [`Step`] - A unit of work that may be attempted more than once
//! - [`Outcome`] - Classified result of an attempt
//! - [`Attempt`] - Immutable record of one execution
//! - [`OutcomeClassifier`] - Splits failures into retryable and fatal
//! - [`RetryPolicy`] - Decides whether to attempt again, and when
//! - [`StepError`] - Errors a step can fail with
//!
//! # Hooks
//!
//! - [`AttemptObserver`] - Streams attempt history to reporters
//! - [`FailureCapture`] - Runs on fatal failure (e.g. screenshots)

mod classify;
mod error;
mod outcome;
mod policy;
mod step;
mod traits;

pub use classify::OutcomeClassifier;
pub use error::{BackoffError, HookError, HookType, StepError};
pub use outcome::{Attempt, Outcome, OutcomeKind, RetryDecision};
pub use policy::{Backoff, RetryPolicy};
pub use step::{FnStep, Step, StepName};
pub use traits::{AttemptObserver, FailureCapture};
