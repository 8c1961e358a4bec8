//! Transport trait and request options

use crate::error::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Network collaborator used for prefetch and remote lookups
///
/// Implementations own any response caching and request coalescing. A
/// transport is shared between engines by cloning an `Arc`, so
/// [`reset_cache`](Transport::reset_cache) purges the cache for everyone
/// using that instance.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `url` and decode the body as JSON
    async fn fetch(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> Result<serde_json::Value, TransportError>;

    /// Drop every cached response
    fn reset_cache(&self);
}

/// HTTP method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// Per-source request options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestOptions {
    /// HTTP method
    pub method: HttpMethod,
    /// Extra request headers
    pub headers: HashMap<String, String>,
    /// Request timeout in milliseconds (transport default if unset)
    pub timeout_ms: Option<u64>,
    /// JSON body sent with POST requests
    pub body: Option<serde_json::Value>,
}

impl RequestOptions {
    /// Add a header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Send as a POST with a JSON body
    pub fn post(mut self, body: serde_json::Value) -> Self {
        self.method = HttpMethod::Post;
        self.body = Some(body);
        self
    }

    pub(crate) fn timeout_duration(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_options_builder() {
        let options = RequestOptions::default()
            .header("X-Api-Key", "secret")
            .timeout(Duration::from_millis(1500));

        assert_eq!(options.method, HttpMethod::Get);
        assert_eq!(options.headers["X-Api-Key"], "secret");
        assert_eq!(options.timeout_duration(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_request_options_from_yaml() {
        let options: RequestOptions =
            serde_yaml::from_str("method: post\ntimeout_ms: 200\nbody: {a: 1}").unwrap();
        assert_eq!(options.method, HttpMethod::Post);
        assert_eq!(options.timeout_ms, Some(200));
        assert_eq!(options.body, Some(serde_json::json!({"a": 1})));
    }
}
