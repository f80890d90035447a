//! Step executor: drives one step through its attempts.

use crate::config::RunnerConfig;
use crate::error::ConfigError;
use crate::rest::RestClientSettings;
use futures_util::FutureExt;
use kurikaeshi_core::{
    Attempt, AttemptObserver, FailureCapture, Outcome, OutcomeClassifier, RetryDecision,
    RetryPolicy, Step, StepError, StepName,
};
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Final result of running a step: the terminal outcome and every attempt made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport<T> {
    step: StepName,
    outcome: Outcome<T>,
    attempts: Vec<Attempt>,
}

impl<T> StepReport<T> {
    pub fn step(&self) -> &StepName {
        &self.step
    }

    pub fn outcome(&self) -> &Outcome<T> {
        &self.outcome
    }

    /// Attempts in the order they were made.
    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    /// `true` only for a successful outcome. Failures and cancellation both fail.
    pub fn passed(&self) -> bool {
        self.outcome.is_success()
    }

    /// Total time spent in attempts, excluding retry delays.
    pub fn time_in_attempts(&self) -> Duration {
        self.attempts.iter().map(Attempt::elapsed).sum()
    }

    pub fn into_parts(self) -> (Outcome<T>, Vec<Attempt>) {
        (self.outcome, self.attempts)
    }
}

/// Runs steps under a retry policy.
///
/// Built once from a [`RunnerConfig`]; plugin flags in the config are resolved
/// into strategies at build time. Running a step never fails: every error,
/// timeout or panic raised by the step ends up in the returned [`StepReport`].
pub struct StepExecutor {
    suite: String,
    timeout: Duration,
    rest: RestClientSettings,
    output_dir: PathBuf,
    classifier: OutcomeClassifier,
    policy: RetryPolicy,
    observers: Vec<Arc<dyn AttemptObserver>>,
    failure_capture: Option<Arc<dyn FailureCapture>>,
}

impl fmt::Debug for StepExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepExecutor")
            .field("suite", &self.suite)
            .field("timeout", &self.timeout)
            .field("output_dir", &self.output_dir)
            .field("policy", &self.policy)
            .field("observers", &self.observers.len())
            .field("failure_capture", &self.failure_capture.is_some())
            .finish()
    }
}

impl StepExecutor {
    /// Creates a builder from a configuration.
    pub fn builder(config: RunnerConfig) -> StepExecutorBuilder {
        StepExecutorBuilder::new(config)
    }

    /// Returns the retry policy in effect.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Returns the per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Request settings steps can use to prepare outbound requests.
    pub fn rest(&self) -> &RestClientSettings {
        &self.rest
    }

    /// Directory passed to the failure capture hook.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Returns `true` if a failure capture hook is installed.
    pub fn captures_failures(&self) -> bool {
        self.failure_capture.is_some()
    }

    /// Runs `step` until it succeeds, fails fatally or runs out of attempts.
    pub async fn run<S>(&self, step: &S) -> StepReport<S::Output>
    where
        S: Step + ?Sized,
    {
        self.run_until_cancelled(step, &CancellationToken::new())
            .await
    }

    /// Like [`run`](Self::run), but a pending retry delay is abandoned when
    /// `cancel` fires, yielding [`Outcome::Cancelled`].
    pub async fn run_until_cancelled<S>(
        &self,
        step: &S,
        cancel: &CancellationToken,
    ) -> StepReport<S::Output>
    where
        S: Step + ?Sized,
    {
        let name = step.name();
        let max_attempts = self.policy.effective_max_attempts(step.max_attempts());
        let span = info_span!(
            "step",
            suite = %self.suite,
            step = %name,
            max_attempts,
            backoff = ?self.policy.backoff()
        );

        self.drive(step, name, max_attempts, cancel)
            .instrument(span)
            .await
    }

    async fn drive<S>(
        &self,
        step: &S,
        name: StepName,
        max_attempts: u32,
        cancel: &CancellationToken,
    ) -> StepReport<S::Output>
    where
        S: Step + ?Sized,
    {
        let mut attempts = Vec::new();
        let mut number = 1;

        loop {
            let started = Instant::now();
            let result = self.attempt(step).await;
            let outcome = self.classifier.classify(result);
            let attempt = Attempt::record(number, &outcome, started.elapsed());

            let elapsed_ms = u64::try_from(attempt.elapsed().as_millis()).unwrap_or(u64::MAX);
            debug!(
                attempt = number,
                kind = %attempt.kind(),
                elapsed_ms,
                "attempt finished"
            );
            self.notify_observers(&name, &attempt).await;
            attempts.push(attempt);

            match self.policy.decide(number, outcome.kind(), max_attempts) {
                RetryDecision::GiveUp => {
                    let report = StepReport {
                        step: name,
                        outcome,
                        attempts,
                    };
                    self.finish(&report).await;
                    return report;
                }
                RetryDecision::Retry(delay) => {
                    if let Some(error) = outcome.error() {
                        info!(
                            "Step '{}' failed: {}, retrying ({}/{})",
                            name,
                            error,
                            number + 1,
                            max_attempts
                        );
                    }

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            warn!("Step '{}' cancelled before attempt {}", name, number + 1);
                            return StepReport {
                                step: name,
                                outcome: Outcome::Cancelled,
                                attempts,
                            };
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }

                    number += 1;
                }
            }
        }
    }

    async fn attempt<S>(&self, step: &S) -> Result<S::Output, StepError>
    where
        S: Step + ?Sized,
    {
        let guarded = AssertUnwindSafe(step.run()).catch_unwind();
        match timeout(self.timeout, guarded).await {
            Ok(Ok(result)) => result,
            Ok(Err(payload)) => Err(StepError::Panicked(panic_message(payload.as_ref()))),
            Err(_) => Err(StepError::Timeout {
                after: self.timeout,
            }),
        }
    }

    async fn finish<T>(&self, report: &StepReport<T>) {
        let name = report.step();
        let attempts = report.attempts();
        match report.outcome() {
            Outcome::Success(_) => {
                info!(
                    "Step '{}' completed successfully after {} attempt(s) in {:?}",
                    name,
                    attempts.len(),
                    report.time_in_attempts()
                );
            }
            Outcome::RetryableFailure(error) => {
                warn!(
                    "Step '{}' failed after {} attempt(s) in {:?}: {}",
                    name,
                    attempts.len(),
                    report.time_in_attempts(),
                    error
                );
            }
            Outcome::FatalFailure(error) => {
                warn!("Step '{}' failed: {}", name, error);
                if let Some(capture) = &self.failure_capture {
                    if let Err(e) = capture
                        .capture(name, error, attempts, &self.output_dir)
                        .await
                    {
                        warn!("Error in failure capture hook: {}", e);
                    }
                }
            }
            Outcome::Cancelled => {}
        }
    }

    async fn notify_observers(&self, name: &StepName, attempt: &Attempt) {
        for observer in &self.observers {
            if let Err(e) = observer.on_attempt(name, attempt).await {
                warn!("Error in attempt observer: {}", e);
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Builder for constructing [`StepExecutor`] instances.
pub struct StepExecutorBuilder {
    config: RunnerConfig,
    classifier: OutcomeClassifier,
    observers: Vec<Arc<dyn AttemptObserver>>,
    failure_capture: Option<Arc<dyn FailureCapture>>,
}

impl StepExecutorBuilder {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            classifier: OutcomeClassifier::default(),
            observers: Vec::new(),
            failure_capture: None,
        }
    }

    /// Replaces the default classifier.
    pub fn classifier(mut self, classifier: OutcomeClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Adds an observer that receives every attempt.
    pub fn observer<O: AttemptObserver + 'static>(mut self, observer: O) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Sets the hook run on fatal failure.
    ///
    /// Only installed when `screenshot_on_fail_enabled` is set in the config.
    pub fn failure_capture<C: FailureCapture + 'static>(mut self, capture: C) -> Self {
        self.failure_capture = Some(Arc::new(capture));
        self
    }

    /// Validates the configuration and builds the executor.
    pub fn build(self) -> Result<StepExecutor, ConfigError> {
        self.config.validate()?;

        let failure_capture = if self.config.screenshot_on_fail_enabled {
            self.failure_capture
        } else {
            if self.failure_capture.is_some() {
                debug!("screenshot_on_fail_enabled is off, failure capture hook not installed");
            }
            None
        };

        Ok(StepExecutor {
            timeout: self.config.timeout(),
            rest: self.config.rest(),
            policy: self.config.retry_policy(),
            output_dir: self.config.output_dir,
            suite: self.config.name,
            classifier: self.classifier,
            observers: self.observers,
            failure_capture,
        })
    }
}
