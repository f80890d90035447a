//! Step trait and related types.

use crate::error::StepError;
use async_trait::async_trait;
use std::fmt::{self, Debug};
use std::future::Future;

/// Type-safe step name wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StepName(String);

impl StepName {
    /// Creates a new StepName.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the step name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StepName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StepName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for StepName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A unit of work that may be attempted more than once.
///
/// A step is immutable once constructed: every attempt calls [`run`](Step::run)
/// on the same value.
///
/// # Examples
///
/// ```
/// use kurikaeshi_core::{Step, StepError, StepName};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct FetchUsers;
///
/// #[async_trait]
/// impl Step for FetchUsers {
///     type Output = Vec<String>;
///
///     async fn run(&self) -> Result<Self::Output, StepError> {
///         Ok(vec!["alice".to_string()])
///     }
///
///     fn name(&self) -> StepName {
///         StepName::new("FetchUsers")
///     }
///
///     fn max_attempts(&self) -> u32 {
///         3
///     }
/// }
/// ```
#[async_trait]
pub trait Step: Send + Sync + Debug {
    /// Value produced by a successful attempt.
    type Output: Send;

    /// Executes one attempt.
    async fn run(&self) -> Result<Self::Output, StepError>;

    /// Returns the step name.
    fn name(&self) -> StepName;

    /// Maximum number of attempts, including the first one.
    ///
    /// The default of 1 means the step is never retried. Zero is treated as 1.
    fn max_attempts(&self) -> u32 {
        1
    }
}

/// A [`Step`] backed by a closure returning a future.
///
/// ```
/// use kurikaeshi_core::{FnStep, Step, StepError};
///
/// let step = FnStep::new("ping", || async { Ok::<_, StepError>("pong") }).with_max_attempts(3);
/// assert_eq!(step.name().as_str(), "ping");
/// assert_eq!(step.max_attempts(), 3);
/// ```
pub struct FnStep<F> {
    name: StepName,
    max_attempts: u32,
    thunk: F,
}

impl<F> FnStep<F> {
    /// Wraps `thunk` as a step that is attempted once.
    pub fn new(name: impl Into<StepName>, thunk: F) -> Self {
        Self {
            name: name.into(),
            max_attempts: 1,
            thunk,
        }
    }

    /// Sets the maximum number of attempts. Zero is clamped to 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

impl<F> Debug for FnStep<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStep")
            .field("name", &self.name)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

#[async_trait]
impl<F, Fut, T> Step for FnStep<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, StepError>> + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    async fn run(&self) -> Result<T, StepError> {
        (self.thunk)().await
    }

    fn name(&self) -> StepName {
        self.name.clone()
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}
