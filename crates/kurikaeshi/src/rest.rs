//! Request preparation for an external HTTP client.
//!
//! Nothing here performs I/O. Steps build a [`PreparedRequest`] and hand it to
//! whatever client the host runner uses.

use crate::config::RunnerConfig;
use http::{HeaderName, HeaderValue};
use kurikaeshi_core::StepError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use url::Url;

/// HTTP method of a prepared request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
        };
        f.write_str(name)
    }
}

/// Endpoint, timeout and default headers shared by every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestClientSettings {
    endpoint: String,
    timeout: Duration,
    default_headers: BTreeMap<String, String>,
}

impl RestClientSettings {
    /// Creates settings with no default headers.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
            default_headers: BTreeMap::new(),
        }
    }

    /// Copies endpoint, timeout and default headers out of a runner config.
    pub fn from_config(config: &RunnerConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            timeout: config.timeout(),
            default_headers: config.default_headers.clone(),
        }
    }

    /// Adds a default header, replacing one whose name differs only by case.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.default_headers
            .retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.default_headers.insert(name, value.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn default_headers(&self) -> &BTreeMap<String, String> {
        &self.default_headers
    }

    /// Starts a request to `path`, relative to the endpoint.
    pub fn request(&self, method: Method, path: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder {
            settings: self,
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(&self, path: impl Into<String>) -> RequestBuilder<'_> {
        self.request(Method::Get, path)
    }

    pub fn post(&self, path: impl Into<String>) -> RequestBuilder<'_> {
        self.request(Method::Post, path)
    }

    pub fn put(&self, path: impl Into<String>) -> RequestBuilder<'_> {
        self.request(Method::Put, path)
    }

    pub fn patch(&self, path: impl Into<String>) -> RequestBuilder<'_> {
        self.request(Method::Patch, path)
    }

    pub fn delete(&self, path: impl Into<String>) -> RequestBuilder<'_> {
        self.request(Method::Delete, path)
    }

    pub fn head(&self, path: impl Into<String>) -> RequestBuilder<'_> {
        self.request(Method::Head, path)
    }

    fn resolve(&self, path: &str) -> String {
        if parse_http_url(path).is_some() {
            return path.to_string();
        }
        let base = self.endpoint.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{path}")
        }
    }
}

/// Builder returned by [`RestClientSettings::request`].
#[derive(Debug)]
pub struct RequestBuilder<'a> {
    settings: &'a RestClientSettings,
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    body: Option<Value>,
}

impl RequestBuilder<'_> {
    /// Sets a header for this request only, replacing any default of the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Resolves the URL and merges headers.
    ///
    /// Fails with a fatal [`StepError`] if any header name or value is not
    /// valid HTTP.
    pub fn build(self) -> Result<PreparedRequest, StepError> {
        let mut headers: Vec<(String, String)> = self
            .settings
            .default_headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        // Header names are case-insensitive; a later override wins.
        for (name, value) in self.headers {
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
            headers.push((name, value));
        }

        for (name, value) in &headers {
            check_header(name, value).map_err(StepError::failed)?;
        }

        Ok(PreparedRequest {
            method: self.method,
            url: self.settings.resolve(&self.path),
            headers,
            body: self.body,
            timeout: self.settings.timeout,
        })
    }
}

/// A fully resolved request, ready for an HTTP client.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub timeout: Duration,
}

impl PreparedRequest {
    /// Looks up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Parses `raw` as an absolute `http` or `https` URL with a host.
pub(crate) fn parse_http_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    let is_http = matches!(url.scheme(), "http" | "https");
    (is_http && url.host_str().is_some_and(|host| !host.is_empty())).then_some(url)
}

/// Checks a header name against the token grammar and rejects values with
/// control characters such as CR or LF.
pub(crate) fn check_header(name: &str, value: &str) -> Result<(), String> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| format!("invalid header name '{name}'"))?;
    HeaderValue::from_str(value).map_err(|_| format!("invalid value for header '{name}'"))?;
    Ok(())
}
