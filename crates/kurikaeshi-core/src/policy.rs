//! Backoff strategies and the retry decision policy.

use crate::error::BackoffError;
use crate::outcome::{OutcomeKind, RetryDecision};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);
const DEFAULT_MULTIPLIER: u32 = 2;

/// Delay strategy between retry attempts.
///
/// Deserializes from a table tagged by `strategy`:
///
/// ```
/// use kurikaeshi_core::Backoff;
/// use std::time::Duration;
///
/// #[derive(serde::Deserialize)]
/// struct Wrapper {
///     backoff: Backoff,
/// }
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let wrapper: Wrapper = serde_json::from_str(
///     r#"{ "backoff": { "strategy": "fixed", "delay_millis": 250 } }"#,
/// )?;
/// assert_eq!(wrapper.backoff, Backoff::fixed(Duration::from_millis(250)));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case", deny_unknown_fields)]
pub enum Backoff {
    /// Retry right away.
    #[default]
    Immediate,
    /// Same delay before every retry.
    Fixed {
        /// Delay between each retry.
        #[serde(rename = "delay_millis", with = "millis")]
        delay: Duration,
    },
    /// Delay grows by `multiplier` after each failed attempt, capped at `max`.
    Exponential {
        /// Delay before the first retry.
        #[serde(rename = "initial_millis", with = "millis")]
        initial: Duration,
        /// Maximum delay cap.
        #[serde(
            rename = "max_millis",
            with = "millis",
            default = "default_max_delay"
        )]
        max: Duration,
        /// Multiplier for each retry.
        #[serde(default = "default_multiplier")]
        multiplier: u32,
    },
}

fn default_max_delay() -> Duration {
    DEFAULT_MAX_DELAY
}

fn default_multiplier() -> u32 {
    DEFAULT_MULTIPLIER
}

impl Backoff {
    /// Creates a fixed backoff.
    pub fn fixed(delay: Duration) -> Self {
        Backoff::Fixed { delay }
    }

    /// Creates an exponential backoff doubling from `initial`, capped at 60s.
    pub fn exponential(initial: Duration) -> Self {
        Backoff::Exponential {
            initial,
            max: DEFAULT_MAX_DELAY.max(initial),
            multiplier: DEFAULT_MULTIPLIER,
        }
    }

    /// Creates an exponential backoff with custom settings.
    pub fn exponential_with(
        initial: Duration,
        max: Duration,
        multiplier: u32,
    ) -> Result<Self, BackoffError> {
        let backoff = Backoff::Exponential {
            initial,
            max,
            multiplier,
        };
        backoff.validate()?;
        Ok(backoff)
    }

    /// Checks the parameters of a deserialized or hand-built backoff.
    pub fn validate(&self) -> Result<(), BackoffError> {
        if let Backoff::Exponential {
            initial,
            max,
            multiplier,
        } = self
        {
            if *multiplier == 0 {
                return Err(BackoffError("multiplier must be greater than 0"));
            }
            if *multiplier > 10 {
                return Err(BackoffError(
                    "multiplier must be 10 or less to avoid overflow",
                ));
            }
            if max < initial {
                return Err(BackoffError("max delay must be >= initial delay"));
            }
        }
        Ok(())
    }

    /// Delay to wait after the failed attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Backoff::Immediate => Duration::ZERO,
            Backoff::Fixed { delay } => *delay,
            Backoff::Exponential {
                initial,
                max,
                multiplier,
            } => multiplier
                .checked_pow(attempt.saturating_sub(1))
                .and_then(|factor| initial.checked_mul(factor))
                .map_or(*max, |delay| delay.min(*max)),
        }
    }
}

/// Decides whether a step gets another attempt.
///
/// A disabled policy always gives up, which is how a global retry switch
/// forces every step down to a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    backoff: Backoff,
    enabled: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Backoff::Immediate)
    }
}

impl RetryPolicy {
    /// Creates an enabled policy with the given backoff.
    pub fn new(backoff: Backoff) -> Self {
        Self {
            backoff,
            enabled: true,
        }
    }

    /// Creates a policy that never retries.
    pub fn disabled() -> Self {
        Self {
            backoff: Backoff::Immediate,
            enabled: false,
        }
    }

    /// Returns `true` unless this policy was created with [`disabled`](Self::disabled).
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the backoff strategy.
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Maximum attempts actually allowed for a step requesting `requested`.
    pub fn effective_max_attempts(&self, requested: u32) -> u32 {
        if self.enabled {
            requested.max(1)
        } else {
            1
        }
    }

    /// Decides what follows attempt `attempt_number` that ended with `outcome`.
    ///
    /// Exhaustion always terminates, whatever the outcome kind.
    pub fn decide(
        &self,
        attempt_number: u32,
        outcome: OutcomeKind,
        max_attempts: u32,
    ) -> RetryDecision {
        if outcome.is_terminal() || attempt_number >= self.effective_max_attempts(max_attempts) {
            RetryDecision::GiveUp
        } else {
            RetryDecision::Retry(self.backoff.delay_for(attempt_number))
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_default_is_immediate() {
        assert_eq!(Backoff::default(), Backoff::Immediate);
        assert_eq!(Backoff::default().delay_for(1), Duration::ZERO);
    }

    #[test]
    fn test_backoff_fixed() {
        let backoff = Backoff::fixed(Duration::from_secs(1));
        assert_eq!(backoff.delay_for(1), Duration::from_secs(1));
        assert_eq!(backoff.delay_for(7), Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_exponential() {
        let backoff = Backoff::exponential(Duration::from_millis(100));
        assert_eq!(backoff.delay_for(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_for(2), Duration::from_millis(200));
        assert_eq!(backoff.delay_for(3), Duration::from_millis(400));
    }

    #[test]
    fn test_backoff_exponential_caps_and_saturates() {
        let backoff =
            Backoff::exponential_with(Duration::from_millis(100), Duration::from_secs(1), 10)
                .unwrap();
        assert_eq!(backoff.delay_for(2), Duration::from_secs(1));
        assert_eq!(backoff.delay_for(u32::MAX), Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_validation() {
        assert!(
            Backoff::exponential_with(Duration::from_millis(100), Duration::from_secs(10), 0)
                .is_err()
        );
        assert!(
            Backoff::exponential_with(Duration::from_millis(100), Duration::from_secs(10), 11)
                .is_err()
        );
        assert!(
            Backoff::exponential_with(Duration::from_secs(10), Duration::from_secs(1), 2).is_err()
        );
        assert!(Backoff::fixed(Duration::ZERO).validate().is_ok());
    }

    #[test]
    fn test_decide_gives_up_on_terminal_outcomes() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.decide(1, OutcomeKind::Success, 5),
            RetryDecision::GiveUp
        );
        assert_eq!(
            policy.decide(1, OutcomeKind::FatalFailure, 5),
            RetryDecision::GiveUp
        );
    }

    #[test]
    fn test_decide_retries_until_exhausted() {
        let policy = RetryPolicy::new(Backoff::fixed(Duration::from_millis(50)));
        assert_eq!(
            policy.decide(1, OutcomeKind::RetryableFailure, 3),
            RetryDecision::Retry(Duration::from_millis(50))
        );
        assert_eq!(
            policy.decide(2, OutcomeKind::RetryableFailure, 3),
            RetryDecision::Retry(Duration::from_millis(50))
        );
        assert_eq!(
            policy.decide(3, OutcomeKind::RetryableFailure, 3),
            RetryDecision::GiveUp
        );
    }

    #[test]
    fn test_single_attempt_never_retries() {
        let policy = RetryPolicy::default();
        for kind in [
            OutcomeKind::Success,
            OutcomeKind::RetryableFailure,
            OutcomeKind::FatalFailure,
        ] {
            assert_eq!(policy.decide(1, kind, 1), RetryDecision::GiveUp);
        }
    }

    #[test]
    fn test_disabled_policy_caps_attempts() {
        let policy = RetryPolicy::disabled();
        assert!(!policy.is_enabled());
        assert_eq!(policy.effective_max_attempts(5), 1);
        assert_eq!(
            policy.decide(1, OutcomeKind::RetryableFailure, 5),
            RetryDecision::GiveUp
        );
    }

    #[test]
    fn test_disabled_policy_drops_backoff() {
        let enabled = RetryPolicy::new(Backoff::fixed(Duration::from_secs(2)));
        assert_eq!(enabled.backoff(), &Backoff::fixed(Duration::from_secs(2)));
        assert_eq!(RetryPolicy::disabled().backoff(), &Backoff::Immediate);
    }

    #[test]
    fn test_backoff_rejects_unknown_keys() {
        let result: Result<Backoff, _> = serde_json::from_str(
            r#"{ "strategy": "exponential", "initial_millis": 100, "max_milis": 500 }"#,
        );
        assert!(result.is_err());

        let backoff: Backoff = serde_json::from_str(
            r#"{ "strategy": "exponential", "initial_millis": 100, "max_millis": 500 }"#,
        )
        .unwrap();
        assert_eq!(backoff.delay_for(10), Duration::from_millis(500));
    }

    #[test]
    fn test_effective_max_attempts_clamps_zero() {
        assert_eq!(RetryPolicy::default().effective_max_attempts(0), 1);
        assert_eq!(RetryPolicy::default().effective_max_attempts(4), 4);
    }
}
