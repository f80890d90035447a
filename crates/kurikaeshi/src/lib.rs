//! A step-retry engine for end-to-end REST API test runners.
//!
//! A test runner hands each step to a [`StepExecutor`], which attempts it until
//! it succeeds, fails fatally or runs out of attempts, and returns the terminal
//! outcome together with the full attempt history.
//!
//! # Example
//!
//! ```rust
//! use kurikaeshi::prelude::*;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), ConfigError> {
//! let executor = StepExecutor::builder(RunnerConfig::default()).build()?;
//!
//! let calls = Arc::new(AtomicU32::new(0));
//! let counter = calls.clone();
//! let step = FnStep::new("get users", move || {
//!     let counter = counter.clone();
//!     async move {
//!         if counter.fetch_add(1, Ordering::SeqCst) == 0 {
//!             Err(StepError::ConnectionReset("peer closed".into()))
//!         } else {
//!             Ok(200u16)
//!         }
//!     }
//! })
//! .with_max_attempts(3);
//!
//! let report = executor.run(&step).await;
//! assert_eq!(report.outcome(), &Outcome::Success(200));
//! assert_eq!(report.attempts().len(), 2);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod executor;
mod response;
mod rest;

// Re-export core types
pub use kurikaeshi_core::*;

pub use config::RunnerConfig;
pub use error::ConfigError;
pub use executor::{StepExecutor, StepExecutorBuilder, StepReport};
pub use response::JsonResponse;
pub use rest::{Method, PreparedRequest, RequestBuilder, RestClientSettings};
pub use tokio_util::sync::CancellationToken;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Attempt, AttemptObserver, Backoff, CancellationToken, ConfigError, FailureCapture,
        FnStep, HookError, HookType, JsonResponse, Method, Outcome, OutcomeClassifier,
        OutcomeKind, PreparedRequest, RestClientSettings, RetryDecision, RetryPolicy,
        RunnerConfig, Step, StepError, StepExecutor, StepName, StepReport,
    };
}
