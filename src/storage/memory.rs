//! In-process storage

use super::{Record, Storage};
use crate::error::StorageError;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

/// Storage kept in memory for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, Record>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|r| !r.is_expired())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(key) {
                None => return Ok(None),
                Some(record) if !record.is_expired() => return Ok(Some(record.value.clone())),
                Some(_) => {}
            }
        }

        // prune the expired entry
        self.remove(key)?;
        Ok(None)
    }

    fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
    ) -> Result<(), StorageError> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), Record::new(key, value, ttl));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }

    fn remove_prefix(&self, prefix: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        storage.set("a", json!("x"), None).unwrap();
        assert_eq!(storage.get("a").unwrap(), Some(json!("x")));
        assert_eq!(storage.get("b").unwrap(), None);

        storage.remove("a").unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn test_expired_entry_is_absent() {
        let storage = MemoryStorage::new();
        storage.set("a", json!(1), Some(Duration::ZERO)).unwrap();
        assert_eq!(storage.get("a").unwrap(), None);
        assert_eq!(storage.len(), 0);
    }

    #[test]
    fn test_remove_prefix() {
        let storage = MemoryStorage::new();
        storage.set("__one__data", json!(1), None).unwrap();
        storage.set("__one__protocol", json!("https:"), None).unwrap();
        storage.set("__two__data", json!(2), None).unwrap();

        storage.remove_prefix("__one__").unwrap();
        assert_eq!(storage.len(), 1);
        assert_eq!(storage.get("__two__data").unwrap(), Some(json!(2)));
    }
}
