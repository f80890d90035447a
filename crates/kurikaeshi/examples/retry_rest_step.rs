//! REST Step Retry Demo.
//!
//! This example demonstrates:
//! 1. Loading a runner configuration from TOML
//! 2. Preparing a request with default headers
//! 3. Retrying a flaky step on connection resets
//! 4. Reporting attempts and capturing fatal failures
//!
//! Run with `RUST_LOG=kurikaeshi=debug` to see every attempt.

use async_trait::async_trait;
use kurikaeshi::prelude::*;
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const CONFIG: &str = r#"
name = "users-api"
endpoint = "http://localhost:3000/api"
timeout_millis = 2000
screenshot_on_fail_enabled = true
output_dir = "target/failures"

[default_headers]
Content-Type = "application/json"
Accept = "application/json"

[backoff]
strategy = "exponential"
initial_millis = 50
max_millis = 400
"#;

// Prints every attempt as it happens
struct ConsoleReporter;

#[async_trait]
impl AttemptObserver for ConsoleReporter {
    async fn on_attempt(&self, step: &StepName, attempt: &Attempt) -> Result<(), HookError> {
        println!(
            "  [{}] attempt {} -> {} ({:?})",
            step,
            attempt.number(),
            attempt.kind(),
            attempt.elapsed()
        );
        Ok(())
    }
}

// Stands in for a screenshot plugin
struct DumpOnFailure;

#[async_trait]
impl FailureCapture for DumpOnFailure {
    async fn capture(
        &self,
        step: &StepName,
        error: &StepError,
        attempts: &[Attempt],
        output_dir: &Path,
    ) -> Result<(), HookError> {
        println!(
            "  capturing failure of '{}' after {} attempt(s) into {}: {}",
            step,
            attempts.len(),
            output_dir.display(),
            error
        );
        Ok(())
    }
}

// Simulated HTTP client: resets the connection twice, then answers.
fn send(request: &PreparedRequest, calls: &AtomicU32) -> Result<JsonResponse, StepError> {
    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
        return Err(StepError::ConnectionReset(format!(
            "{} {}",
            request.method, request.url
        )));
    }
    Ok(JsonResponse::new(
        200,
        json!({ "users": [{ "id": 1, "name": "Alice" }], "total": 1 }),
    ))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kurikaeshi=info")),
        )
        .init();

    let config = RunnerConfig::from_toml_str(CONFIG)?;
    let executor = StepExecutor::builder(config)
        .observer(ConsoleReporter)
        .failure_capture(DumpOnFailure)
        .build()?;

    println!("Listing users...");
    let request = executor.rest().get("/users").build()?;
    let calls = Arc::new(AtomicU32::new(0));
    let list_users = FnStep::new("list users", move || {
        let request = request.clone();
        let calls = calls.clone();
        async move {
            let response = send(&request, &calls)?;
            response.assert_success()?;
            response.assert_contains_keys(&["users", "total"])?;
            Ok::<_, StepError>(response)
        }
    })
    .with_max_attempts(3);

    let report = executor.run(&list_users).await;
    println!(
        "  passed: {} after {} attempt(s)",
        report.passed(),
        report.attempts().len()
    );

    println!("Checking a missing user...");
    let missing_user = FnStep::new("get missing user", || async {
        let response = JsonResponse::new(404, json!({ "error": "not found" }));
        response.assert_status(200)?;
        Ok::<_, StepError>(response)
    })
    .with_max_attempts(3);

    let report = executor.run(&missing_user).await;
    match report.outcome() {
        Outcome::FatalFailure(error) => println!("  failed as expected: {}", error),
        other => println!("  unexpected outcome: {:?}", other.kind()),
    }

    Ok(())
}
