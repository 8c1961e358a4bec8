//! HTTP transport backed by reqwest

use super::transport::{HttpMethod, RequestOptions, Transport};
use crate::config::TransportSettings;
use crate::error::{Error, TransportError};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use moka::future::Cache;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::debug;

/// HTTP transport with a shared response cache
///
/// Clones share the client, the response cache, the pending-request limit
/// and the rate limiter.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    cache: Cache<String, Value>,
    pending: Arc<Semaphore>,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
    default_timeout: Duration,
    extra_headers: HashMap<String, String>,
}

impl HttpTransport {
    /// Create a transport with default settings
    pub fn new() -> Result<Self, Error> {
        Self::with_settings(&TransportSettings::default())
    }

    /// Create a transport with custom settings
    pub fn with_settings(settings: &TransportSettings) -> Result<Self, Error> {
        let timeout = Duration::try_from_secs_f64(settings.request_timeout).map_err(|e| {
            Error::config(format!(
                "invalid request timeout {}: {}",
                settings.request_timeout, e
            ))
        })?;

        let mut builder = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("bloodhound-rs/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .brotli(true);

        // SSL verification
        if !settings.verify_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }

        // Proxy settings
        if let Some(ref proxy_url) = settings.proxies.all {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url).map_err(invalid_proxy)?);
        } else {
            if let Some(ref http) = settings.proxies.http {
                builder = builder.proxy(reqwest::Proxy::http(http).map_err(invalid_proxy)?);
            }
            if let Some(ref https) = settings.proxies.https {
                builder = builder.proxy(reqwest::Proxy::https(https).map_err(invalid_proxy)?);
            }
        }

        let client = builder
            .build()
            .map_err(|e| Error::config(format!("cannot build HTTP client: {}", e)))?;

        let limiter = settings
            .rate_limit_wait_ms
            .and_then(|ms| Quota::with_period(Duration::from_millis(ms)))
            .map(|quota| Arc::new(RateLimiter::direct(quota)));

        Ok(Self {
            client,
            cache: Cache::builder()
                .max_capacity(settings.cache_capacity)
                .build(),
            pending: Arc::new(Semaphore::new(settings.max_pending_requests.max(1))),
            limiter,
            default_timeout: timeout,
            extra_headers: settings.extra_headers.clone(),
        })
    }

    fn cache_key(url: &str, options: &RequestOptions) -> String {
        match &options.body {
            Some(body) => format!("{} {} {}", options.method.as_str(), url, body),
            None => format!("{} {}", options.method.as_str(), url),
        }
    }

    /// Issue the request, bypassing the response cache
    async fn send(&self, url: &str, options: &RequestOptions) -> Result<Value, TransportError> {
        let _permit = self
            .pending
            .acquire()
            .await
            .map_err(|e| TransportError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let mut req_builder = match options.method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
        };

        req_builder = req_builder
            .timeout(options.timeout_duration().unwrap_or(self.default_timeout))
            .header("Accept", "application/json");

        for (key, value) in self.extra_headers.iter().chain(options.headers.iter()) {
            req_builder = req_builder.header(key, value);
        }

        if let Some(body) = &options.body {
            req_builder = req_builder.json(body);
        }

        debug!("{} {}", options.method.as_str(), url);

        let response = req_builder.send().await.map_err(|e| request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await.map_err(|e| request_error(url, e))?;

        serde_json::from_str(&text).map_err(|e| TransportError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Number of cached responses
    pub fn cached_responses(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str, options: &RequestOptions) -> Result<Value, TransportError> {
        // concurrent callers with the same key share one request; failures are not cached
        self.cache
            .try_get_with(Self::cache_key(url, options), self.send(url, options))
            .await
            .map_err(|e| (*e).clone())
    }

    fn reset_cache(&self) {
        self.cache.invalidate_all();
    }
}

fn invalid_proxy(e: reqwest::Error) -> Error {
    Error::config(format!("invalid proxy: {}", e))
}

fn request_error(url: &str, e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else {
        TransportError::Request {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}
