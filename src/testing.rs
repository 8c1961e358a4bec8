//! Test doubles shared by unit tests

use crate::error::TransportError;
use crate::network::{RequestOptions, Transport};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Transport answering from a fixed URL -> response table
///
/// Unknown URLs fail with a 404 status error.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, Value>>,
    requests: Mutex<Vec<String>>,
    delay: Mutex<Option<Duration>>,
    resets: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, body: Value) {
        self.responses.lock().unwrap().insert(url.to_string(), body);
    }

    pub fn delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(&self, url: &str, _options: &RequestOptions) -> Result<Value, TransportError> {
        self.requests.lock().unwrap().push(url.to_string());

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let response = self.responses.lock().unwrap().get(url).cloned();
        response.ok_or_else(|| TransportError::Status {
            url: url.to_string(),
            status: 404,
        })
    }

    fn reset_cache(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}
