//! Storage persisted as JSON files on disk

use super::{Record, Storage};
use crate::error::StorageError;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::debug;

/// One JSON record file per key inside a directory
///
/// File names are the SHA-256 of the key so arbitrary keys are safe on disk;
/// the original key is kept inside the record.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) a storage directory
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            StorageError::Unavailable(format!("cannot create {}: {}", dir.display(), e))
        })?;

        Ok(Self { dir })
    }

    /// Storage under the user's cache directory
    pub fn default_location() -> Result<Self, StorageError> {
        let dir = dirs::cache_dir()
            .map(|p| p.join("bloodhound-rs"))
            .ok_or_else(|| StorageError::Unavailable("no cache directory".to_string()))?;
        Self::open(dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        self.dir.join(format!("{:x}.json", hasher.finalize()))
    }

    fn read_record(path: &Path) -> Result<Option<Record>, StorageError> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn remove_file(path: &Path) -> Result<(), StorageError> {
        match fs::remove_file(path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        let path = self.path_for(key);
        match Self::read_record(&path)? {
            Some(record) if record.is_expired() => {
                debug!("Pruning expired storage entry {}", key);
                Self::remove_file(&path)?;
                Ok(None)
            }
            Some(record) => Ok(Some(record.value)),
            None => Ok(None),
        }
    }

    fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
    ) -> Result<(), StorageError> {
        let record = Record::new(key, value, ttl);
        let path = self.path_for(key);

        // each writer gets its own temp file; the rename is what readers observe
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&serde_json::to_vec(&record)?)?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        Self::remove_file(&self.path_for(key))
    }

    fn remove_prefix(&self, prefix: &str) -> Result<(), StorageError> {
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            // unreadable files are not ours to judge; leave them
            if let Ok(Some(record)) = Self::read_record(&path) {
                if record.key.starts_with(prefix) {
                    Self::remove_file(&path)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        storage.set("__people__data", json!({"a": [1, 2]}), None).unwrap();
        assert_eq!(
            storage.get("__people__data").unwrap(),
            Some(json!({"a": [1, 2]}))
        );

        // a second handle over the same directory sees the same data
        let reopened = FileStorage::open(dir.path()).unwrap();
        assert!(reopened.get("__people__data").unwrap().is_some());
    }

    #[test]
    fn test_concurrent_writers_same_key() {
        let dir = tempfile::tempdir().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let storage = FileStorage::open(dir.path()).unwrap();
                std::thread::spawn(move || {
                    for _ in 0..20 {
                        storage.set("__people__data", json!(i), None).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let storage = FileStorage::open(dir.path()).unwrap();
        assert!(storage.get("__people__data").unwrap().is_some());
        // no temp files are left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_file_storage_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        storage.set("k", json!(1), Some(Duration::ZERO)).unwrap();
        assert_eq!(storage.get("k").unwrap(), None);
        assert!(!storage.path_for("k").exists());
    }

    #[test]
    fn test_file_storage_remove_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        storage.set("__a__data", json!(1), None).unwrap();
        storage.set("__a__thumbprint", json!("x"), None).unwrap();
        storage.set("__b__data", json!(2), None).unwrap();

        storage.remove_prefix("__a__").unwrap();
        assert_eq!(storage.get("__a__data").unwrap(), None);
        assert_eq!(storage.get("__a__thumbprint").unwrap(), None);
        assert_eq!(storage.get("__b__data").unwrap(), Some(json!(2)));
    }

    #[test]
    fn test_unavailable_directory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();

        let result = FileStorage::open(blocker.join("sub"));
        assert!(matches!(result, Err(StorageError::Unavailable(_))));
    }
}
