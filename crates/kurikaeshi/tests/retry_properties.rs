use kurikaeshi::prelude::*;
use proptest::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

// Fails with a retryable error on the first `fail_first` calls, then succeeds.
fn run_flaky(
    max_attempts: u32,
    fail_first: u32,
    retry_enabled: bool,
) -> (StepReport<u32>, u32) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime");
    let config = RunnerConfig {
        retry_enabled,
        ..RunnerConfig::default()
    };
    let executor = StepExecutor::builder(config).build().expect("valid config");

    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let step = FnStep::new("flaky", move || {
        let counter = counter.clone();
        async move {
            let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= fail_first {
                Err(StepError::retryable("busy"))
            } else {
                Ok(call)
            }
        }
    })
    .with_max_attempts(max_attempts);

    let report = runtime.block_on(executor.run(&step));
    (report, calls.load(Ordering::SeqCst))
}

proptest! {
    // Always-retryable step: exactly N attempts, numbered 1..=N, last outcome kept.
    #[test]
    fn exhaustion_makes_exactly_max_attempts(max_attempts in 1u32..=12) {
        let (report, calls) = run_flaky(max_attempts, u32::MAX, true);

        prop_assert_eq!(calls, max_attempts);
        let numbers: Vec<u32> = report.attempts().iter().map(Attempt::number).collect();
        prop_assert_eq!(numbers, (1..=max_attempts).collect::<Vec<_>>());
        prop_assert_eq!(report.outcome().kind(), OutcomeKind::RetryableFailure);
        prop_assert!(report
            .attempts()
            .iter()
            .all(|attempt| attempt.kind() == OutcomeKind::RetryableFailure));
    }

    // Success on attempt K <= N stops there with K attempts.
    #[test]
    fn success_on_attempt_k_stops_at_k(
        (max_attempts, success_at) in (1u32..=12).prop_flat_map(|n| (Just(n), 1..=n))
    ) {
        let (report, calls) = run_flaky(max_attempts, success_at - 1, true);

        prop_assert_eq!(calls, success_at);
        prop_assert_eq!(report.attempts().len() as u32, success_at);
        prop_assert_eq!(report.outcome(), &Outcome::Success(success_at));
        let last = report.attempts().last().map(Attempt::kind);
        prop_assert_eq!(last, Some(OutcomeKind::Success));
    }

    // Retry disabled: one attempt whatever the step asks for.
    #[test]
    fn disabled_retry_makes_one_attempt(max_attempts in 0u32..=12) {
        let (report, calls) = run_flaky(max_attempts, u32::MAX, false);

        prop_assert_eq!(calls, 1);
        prop_assert_eq!(report.attempts().len(), 1);
    }
}
