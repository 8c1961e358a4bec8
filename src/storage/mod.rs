//! Persistent key/value storage backends
//!
//! Backends own TTL expiry: an expired entry reads as absent.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::StorageError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Synchronous key/value store with optional per-entry TTL
pub trait Storage: Send + Sync {
    /// Read a value; expired or missing entries are `None`
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError>;

    /// Write a value, replacing any previous one
    fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
    ) -> Result<(), StorageError>;

    /// Remove a single key
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Remove every key starting with `prefix`
    fn remove_prefix(&self, prefix: &str) -> Result<(), StorageError>;
}

/// A stored value together with its expiry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Record {
    pub key: String,
    pub value: serde_json::Value,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Record {
    pub fn new(key: &str, value: serde_json::Value, ttl: Option<Duration>) -> Self {
        let expires_at = ttl
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));

        Self {
            key: key.to_string(),
            value,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_expiry() {
        let record = Record::new("k", serde_json::json!(1), None);
        assert!(!record.is_expired());

        let record = Record::new("k", serde_json::json!(1), Some(Duration::ZERO));
        assert!(record.is_expired());

        let record = Record::new("k", serde_json::json!(1), Some(Duration::from_secs(60)));
        assert!(!record.is_expired());
    }
}
