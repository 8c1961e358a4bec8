//! Prefetch cache
//!
//! Persists the serialized index built from a prefetch response so later
//! sessions can skip the network. An entry is only trusted when both its
//! thumbprint and the protocol it was stored under still match.

use crate::storage::Storage;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Schema keys stored for every prefetch cache namespace
pub mod keys {
    pub const DATA: &str = "data";
    pub const PROTOCOL: &str = "protocol";
    pub const THUMBPRINT: &str = "thumbprint";
}

/// Gateway between the engine and a [`Storage`] backend
#[derive(Clone)]
pub struct PrefetchCache {
    storage: Arc<dyn Storage>,
    prefix: String,
}

impl PrefetchCache {
    /// Bind a storage backend to the namespace of `cache_key`
    pub fn new(storage: Arc<dyn Storage>, cache_key: &str) -> Self {
        Self {
            storage,
            prefix: format!("__{}__", cache_key),
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    fn read_key(&self, name: &str) -> Option<Value> {
        match self.storage.get(&self.key(name)) {
            Ok(value) => value,
            Err(e) => {
                warn!("Prefetch cache read of '{}' failed: {}", name, e);
                None
            }
        }
    }

    /// Cached index blob, if one was stored under this thumbprint and protocol
    pub fn read(&self, thumbprint: &str, protocol: &str) -> Option<Value> {
        let data = self.read_key(keys::DATA)?;
        let stored_protocol = self.read_key(keys::PROTOCOL);
        let stored_thumbprint = self.read_key(keys::THUMBPRINT);

        let is_stale = stored_thumbprint.as_ref().and_then(Value::as_str) != Some(thumbprint)
            || stored_protocol.as_ref().and_then(Value::as_str) != Some(protocol);

        if is_stale {
            debug!("Prefetch cache entry {} is stale", self.prefix);
            return None;
        }

        Some(data)
    }

    /// Store an index blob under the current thumbprint and protocol
    pub fn write(&self, data: Value, thumbprint: &str, protocol: &str, ttl: Duration) {
        let entries = [
            (keys::DATA, data),
            (keys::PROTOCOL, Value::from(protocol)),
            (keys::THUMBPRINT, Value::from(thumbprint)),
        ];

        for (name, value) in entries {
            if let Err(e) = self.storage.set(&self.key(name), value, Some(ttl)) {
                warn!("Prefetch cache write of '{}' failed: {}", name, e);
                return;
            }
        }
    }

    /// Remove every key of this namespace
    pub fn clear(&self) {
        if let Err(e) = self.storage.remove_prefix(&self.prefix) {
            warn!("Failed to clear prefetch cache {}: {}", self.prefix, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    const TTL: Duration = Duration::from_secs(60);

    fn cache() -> (Arc<MemoryStorage>, PrefetchCache) {
        let storage = Arc::new(MemoryStorage::new());
        let cache = PrefetchCache::new(storage.clone(), "people.json");
        (storage, cache)
    }

    #[test]
    fn test_matching_entry_is_present() {
        let (_, cache) = cache();
        cache.write(json!({"datums": []}), "v1", "https:", TTL);
        assert_eq!(cache.read("v1", "https:"), Some(json!({"datums": []})));
    }

    #[test]
    fn test_protocol_change_invalidates() {
        let (_, cache) = cache();
        cache.write(json!([1]), "v1", "http:", TTL);
        assert_eq!(cache.read("v1", "https:"), None);
    }

    #[test]
    fn test_thumbprint_change_invalidates() {
        let (_, cache) = cache();
        cache.write(json!([1]), "v1", "https:", TTL);
        assert_eq!(cache.read("v2", "https:"), None);
    }

    #[test]
    fn test_namespaced_keys() {
        let (storage, cache) = cache();
        cache.write(json!([1]), "v1", "https:", TTL);
        assert_eq!(
            storage.get("__people.json__thumbprint").unwrap(),
            Some(json!("v1"))
        );

        cache.clear();
        assert!(storage.is_empty());
        assert_eq!(cache.read("v1", "https:"), None);
    }

    struct BrokenStorage;

    impl Storage for BrokenStorage {
        fn get(&self, _: &str) -> Result<Option<Value>, StorageError> {
            Err(StorageError::Unavailable("quota".to_string()))
        }

        fn set(&self, _: &str, _: Value, _: Option<Duration>) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota".to_string()))
        }

        fn remove(&self, _: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota".to_string()))
        }

        fn remove_prefix(&self, _: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota".to_string()))
        }
    }

    #[test]
    fn test_unavailable_storage_always_misses() {
        let cache = PrefetchCache::new(Arc::new(BrokenStorage), "k");
        cache.write(json!([1]), "v1", "https:", TTL);
        assert_eq!(cache.read("v1", "https:"), None);
        cache.clear();
    }
}
