//! Collaborator hooks notified by the executor.

use crate::error::{HookError, StepError};
use crate::outcome::Attempt;
use crate::step::StepName;
use async_trait::async_trait;
use std::path::Path;

/// Receives every attempt as soon as it is recorded.
///
/// Reporters use this to stream attempt history while a step is still being
/// retried.
///
/// # Examples
///
/// ```
/// use kurikaeshi_core::{Attempt, AttemptObserver, HookError, StepName};
/// use async_trait::async_trait;
/// use std::sync::Mutex;
///
/// #[derive(Default)]
/// struct Recorder(Mutex<Vec<u32>>);
///
/// #[async_trait]
/// impl AttemptObserver for Recorder {
///     async fn on_attempt(&self, _step: &StepName, attempt: &Attempt) -> Result<(), HookError> {
///         if let Ok(mut seen) = self.0.lock() {
///             seen.push(attempt.number());
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait AttemptObserver: Send + Sync {
    /// Called after each attempt is classified.
    async fn on_attempt(&self, step: &StepName, attempt: &Attempt) -> Result<(), HookError>;
}

/// Invoked when a step ends with a fatal failure.
///
/// The screenshot-on-fail plugin of a UI runner plugs in here. Artifacts go
/// under `output_dir`, which comes from the runner configuration.
#[async_trait]
pub trait FailureCapture: Send + Sync {
    /// Called once, after the last attempt, with the full attempt history.
    async fn capture(
        &self,
        step: &StepName,
        error: &StepError,
        attempts: &[Attempt],
        output_dir: &Path,
    ) -> Result<(), HookError>;
}
