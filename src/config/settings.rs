//! Settings structures for Bloodhound-RS configuration

use crate::network::RequestOptions;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Serializable engine configuration
///
/// Covers everything that can be expressed as data. Functions (filters,
/// sorters, duplicate detectors, tokenizers) and local datums are supplied
/// through the engine builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Maximum number of suggestions returned per query
    pub limit: usize,
    pub prefetch: Option<PrefetchSettings>,
    pub remote: Option<RemoteSettings>,
    pub storage: StorageSettings,
    pub transport: TransportSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            limit: crate::DEFAULT_LIMIT,
            prefetch: None,
            remote: None,
            storage: StorageSettings::default(),
            transport: TransportSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        Ok(settings)
    }

    /// Merge with environment variables (BLOODHOUND_* prefix)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("BLOODHOUND_LIMIT") {
            if let Ok(limit) = val.parse() {
                self.limit = limit;
            }
        }
        if let Ok(val) = std::env::var("BLOODHOUND_PREFETCH_URL") {
            self.prefetch.get_or_insert_with(PrefetchSettings::default).url = val;
        }
        if let Ok(val) = std::env::var("BLOODHOUND_PREFETCH_THUMBPRINT") {
            self.prefetch.get_or_insert_with(PrefetchSettings::default).thumbprint = val;
        }
        if let Ok(val) = std::env::var("BLOODHOUND_REMOTE_URL") {
            self.remote.get_or_insert_with(RemoteSettings::default).url = val;
        }
        if let Ok(val) = std::env::var("BLOODHOUND_STORAGE_DIR") {
            self.storage.backend = StorageBackend::File;
            self.storage.dir = Some(PathBuf::from(val));
        }
        if let Ok(val) = std::env::var("BLOODHOUND_REQUEST_TIMEOUT") {
            if let Ok(timeout) = val.parse() {
                self.transport.request_timeout = timeout;
            }
        }
    }
}

/// Prefetch source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefetchSettings {
    /// URL of the JSON document to prefetch
    pub url: String,
    /// Storage namespace (defaults to the URL)
    pub cache_key: Option<String>,
    /// Caller-chosen dataset identifier; change it to invalidate the cache
    pub thumbprint: String,
    /// Cache lifetime in milliseconds
    pub ttl_ms: u64,
    /// Protocol the cache entry is bound to (defaults to the URL scheme)
    pub protocol: Option<String>,
    pub request: RequestOptions,
}

impl Default for PrefetchSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            cache_key: None,
            thumbprint: String::new(),
            ttl_ms: 86_400_000,
            protocol: None,
            request: RequestOptions::default(),
        }
    }
}

/// Remote source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// URL template; the wildcard is replaced by the encoded query
    pub url: String,
    /// Placeholder inside `url`
    pub wildcard: String,
    pub request: RequestOptions,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            wildcard: "%QUERY".to_string(),
            request: RequestOptions::default(),
        }
    }
}

/// Which storage backend persists the prefetch cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Process lifetime only
    #[default]
    Memory,
    /// JSON files on disk
    File,
}

/// Storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// Directory for the file backend (user cache dir if unset)
    pub dir: Option<PathBuf>,
}

/// Outgoing request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Default request timeout in seconds
    pub request_timeout: f64,
    /// Number of responses kept in the response cache
    pub cache_capacity: u64,
    /// Maximum number of requests in flight at once
    pub max_pending_requests: usize,
    /// Minimum spacing between requests in milliseconds (no throttling if unset)
    pub rate_limit_wait_ms: Option<u64>,
    /// Verify SSL certificates
    pub verify_ssl: bool,
    /// Proxy settings
    pub proxies: ProxySettings,
    /// Extra headers to send
    pub extra_headers: HashMap<String, String>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            request_timeout: 5.0,
            cache_capacity: 10,
            max_pending_requests: 6,
            rate_limit_wait_ms: None,
            verify_ssl: true,
            proxies: ProxySettings::default(),
            extra_headers: HashMap::new(),
        }
    }
}

/// Proxy settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub http: Option<String>,
    pub https: Option<String>,
    pub all: Option<String>,
}
