//! Runner configuration.
//!
//! A [`RunnerConfig`] is plain data passed by value into the executor builder.
//! There is no process-wide configuration.
//!
//! ```toml
//! name = "api"
//! endpoint = "http://localhost:3000/api"
//! timeout_millis = 10000
//! retry_enabled = true
//! screenshot_on_fail_enabled = false
//! output_dir = "./output"
//!
//! [default_headers]
//! Content-Type = "application/json"
//! Accept = "application/json"
//!
//! [backoff]
//! strategy = "exponential"
//! initial_millis = 100
//! max_millis = 2000
//! ```

use crate::error::ConfigError;
use crate::rest::{check_header, parse_http_url, RestClientSettings};
use kurikaeshi_core::{Backoff, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options recognised by the runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    /// Suite name, attached to the tracing span of every step run.
    pub name: String,
    /// Base URL outbound requests are resolved against.
    pub endpoint: String,
    /// Per-request timeout. Exceeding it is a retryable failure by default.
    pub timeout_millis: u64,
    /// Headers applied to every request unless overridden per request.
    pub default_headers: BTreeMap<String, String>,
    /// When `false`, every step gets exactly one attempt.
    pub retry_enabled: bool,
    /// Delay strategy between retries.
    pub backoff: Backoff,
    /// When `true`, the failure capture hook runs on fatal failures.
    pub screenshot_on_fail_enabled: bool,
    /// Directory handed to the failure capture hook for its artifacts.
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let default_headers = [
            ("Content-Type", "application/json"),
            ("Accept", "application/json"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            name: "test".to_string(),
            endpoint: "http://localhost:3000/api".to_string(),
            timeout_millis: 10_000,
            default_headers,
            retry_enabled: true,
            backoff: Backoff::Immediate,
            screenshot_on_fail_enabled: false,
            output_dir: PathBuf::from("./output"),
        }
    }
}

impl RunnerConfig {
    /// Parses and validates a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges that the type system does not enforce.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if parse_http_url(&self.endpoint).is_none() {
            return Err(ConfigError::Invalid(format!(
                "endpoint must be an absolute http(s) URL, got '{}'",
                self.endpoint
            )));
        }

        if self.timeout_millis == 0 {
            return Err(ConfigError::Invalid(
                "timeout_millis must be greater than 0".to_string(),
            ));
        }

        for (name, value) in &self.default_headers {
            check_header(name, value).map_err(ConfigError::Invalid)?;
        }

        // BTreeMap keys are unique, but only case-sensitively.
        let names: Vec<&String> = self.default_headers.keys().collect();
        for (i, name) in names.iter().enumerate() {
            if names[i + 1..]
                .iter()
                .any(|other| other.eq_ignore_ascii_case(name))
            {
                return Err(ConfigError::Invalid(format!(
                    "header '{name}' is set more than once with different case"
                )));
            }
        }

        self.backoff.validate()?;
        Ok(())
    }

    /// Per-request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_millis)
    }

    /// The retry strategy selected by `retry_enabled` and `backoff`.
    pub fn retry_policy(&self) -> RetryPolicy {
        if self.retry_enabled {
            RetryPolicy::new(self.backoff)
        } else {
            RetryPolicy::disabled()
        }
    }

    /// Request preparation settings derived from this config.
    pub fn rest(&self) -> RestClientSettings {
        RestClientSettings::from_config(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.endpoint, "http://localhost:3000/api");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(
            config.default_headers.get("Accept").map(String::as_str),
            Some("application/json")
        );
        assert!(config.retry_enabled);
        assert!(!config.screenshot_on_fail_enabled);
        assert_eq!(config.output_dir, PathBuf::from("./output"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = RunnerConfig::from_toml_str("").unwrap();
        assert_eq!(config, RunnerConfig::default());
    }

    #[test]
    fn test_parse_full_document() {
        let config = RunnerConfig::from_toml_str(
            r#"
            name = "orders"
            endpoint = "https://staging.example.com/v2"
            timeout_millis = 2500
            retry_enabled = false
            screenshot_on_fail_enabled = true
            output_dir = "target/failures"

            [default_headers]
            Authorization = "Bearer token"

            [backoff]
            strategy = "fixed"
            delay_millis = 300
            "#,
        )
        .unwrap();

        assert_eq!(config.name, "orders");
        assert_eq!(config.timeout(), Duration::from_millis(2500));
        assert_eq!(config.default_headers.len(), 1);
        assert_eq!(config.backoff, Backoff::fixed(Duration::from_millis(300)));
        assert!(!config.retry_policy().is_enabled());
        assert!(config.screenshot_on_fail_enabled);
        assert_eq!(config.output_dir, PathBuf::from("target/failures"));
    }

    #[test]
    fn test_exponential_backoff_defaults() {
        let config = RunnerConfig::from_toml_str(
            r#"
            [backoff]
            strategy = "exponential"
            initial_millis = 100
            "#,
        )
        .unwrap();

        assert_eq!(config.backoff, Backoff::exponential(Duration::from_millis(100)));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result = RunnerConfig::from_toml_str("retries = 3");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_invalid_values() {
        let result = RunnerConfig::from_toml_str(r#"endpoint = "localhost:3000""#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let result = RunnerConfig::from_toml_str("timeout_millis = 0");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let result = RunnerConfig::from_toml_str(
            r#"
            [default_headers]
            "Bad Header" = "x"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let result = RunnerConfig::from_toml_str(
            r#"
            [backoff]
            strategy = "exponential"
            initial_millis = 100
            multiplier = 0
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Backoff(_))));
    }

    #[test]
    fn test_malformed_endpoints_are_rejected() {
        for endpoint in [
            "http://exa mple.com/api",
            "http://:::",
            "https://[not-ipv6/api",
            "http://a b c",
            "ftp://files.example.com",
            "http://",
        ] {
            let config = RunnerConfig {
                endpoint: endpoint.to_string(),
                ..RunnerConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(ConfigError::Invalid(_))),
                "accepted endpoint {endpoint:?}"
            );
        }
    }

    #[test]
    fn test_invalid_headers_are_rejected() {
        let result = RunnerConfig::from_toml_str(
            r#"
            [default_headers]
            Accept = "a\r\nX-Injected: 1"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        for name in ["X(1)", "a,b", "\"quoted\""] {
            let mut config = RunnerConfig::default();
            config.default_headers.insert(name.to_string(), "x".to_string());
            assert!(
                matches!(config.validate(), Err(ConfigError::Invalid(_))),
                "accepted header name {name:?}"
            );
        }
    }

    #[test]
    fn test_headers_differing_only_by_case_are_rejected() {
        let result = RunnerConfig::from_toml_str(
            r#"
            [default_headers]
            Accept = "a"
            accept = "b"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_misspelled_backoff_key_is_rejected() {
        let result = RunnerConfig::from_toml_str(
            r#"
            [backoff]
            strategy = "exponential"
            initial_millis = 100
            max_milis = 500
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));

        let result = RunnerConfig::from_toml_str(
            r#"
            [backoff]
            strategy = "fixed"
            delay_milis = 300
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_retry_policy_follows_flag() {
        let config = RunnerConfig {
            backoff: Backoff::fixed(Duration::from_millis(5)),
            ..RunnerConfig::default()
        };
        assert_eq!(config.retry_policy().effective_max_attempts(4), 4);

        let config = RunnerConfig {
            retry_enabled: false,
            ..config
        };
        assert_eq!(config.retry_policy().effective_max_attempts(4), 1);
    }
}
