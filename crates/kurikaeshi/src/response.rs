//! Assertions over JSON responses.
//!
//! Every assertion returns a [`StepError`], so a failed check inside a step is
//! classified like any other failure (fatal, with the default classifier).

use kurikaeshi_core::StepError;
use serde_json::Value;

/// A decoded HTTP response with a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonResponse {
    status: u16,
    body: Value,
}

impl JsonResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Decodes `bytes` as JSON. An empty body decodes to `null`.
    pub fn from_slice(status: u16, bytes: &[u8]) -> Result<Self, StepError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::new(status, Value::Null));
        }
        let body = serde_json::from_slice(bytes).map_err(|e| {
            StepError::assertion(format!("response body is not valid JSON: {e}"))
        })?;
        Ok(Self::new(status, body))
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn assert_status(&self, expected: u16) -> Result<(), StepError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(StepError::UnexpectedStatus {
                expected,
                actual: self.status,
            })
        }
    }

    /// Passes for any 2xx status.
    pub fn assert_success(&self) -> Result<(), StepError> {
        if (200..300).contains(&self.status) {
            Ok(())
        } else {
            Err(StepError::assertion(format!(
                "expected a 2xx status, got {}",
                self.status
            )))
        }
    }

    /// Checks that the body is an object containing every key in `keys`.
    pub fn assert_contains_keys(&self, keys: &[&str]) -> Result<(), StepError> {
        let object = self.body.as_object().ok_or_else(|| {
            StepError::assertion(format!("expected a JSON object, got {}", self.body))
        })?;

        let missing: Vec<&str> = keys
            .iter()
            .copied()
            .filter(|key| !object.contains_key(*key))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(StepError::assertion(format!(
                "missing keys: {}",
                missing.join(", ")
            )))
        }
    }

    /// Checks that `expected` is contained in the body.
    ///
    /// Objects match when every expected key is present with a matching value;
    /// extra keys in the body are ignored. Arrays and scalars must be equal.
    pub fn assert_contains_json(&self, expected: &Value) -> Result<(), StepError> {
        if contains(&self.body, expected) {
            Ok(())
        } else {
            Err(StepError::assertion(format!(
                "response {} does not contain {}",
                self.body, expected
            )))
        }
    }
}

fn contains(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Object(actual), Value::Object(expected)) => expected
            .iter()
            .all(|(key, value)| actual.get(key).is_some_and(|a| contains(a, value))),
        _ => actual == expected,
    }
}
