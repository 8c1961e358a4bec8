//! Source descriptors
//!
//! Raw per-source options are validated once at engine construction and
//! turned into immutable descriptors. Later changes to the options have no
//! effect on a built engine.

use crate::config::{PrefetchSettings, RemoteSettings};
use crate::error::{Error, Result};
use crate::network::RequestOptions;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default prefetch cache lifetime
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default placeholder replaced by the query in remote URL templates
pub const DEFAULT_WILDCARD: &str = "%QUERY";

/// Turns a raw JSON response into datums
pub type Filter<D> = Arc<dyn Fn(Value) -> Vec<D> + Send + Sync>;

/// Builds a remote URL from `(template, query)`
pub type Replace = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;

/// Produces local datums on demand
pub type Producer<D> = Arc<dyn Fn() -> Vec<D> + Send + Sync>;

/// Datums available without any I/O
#[derive(Clone)]
pub enum LocalSource<D> {
    Literal(Vec<D>),
    Producer(Producer<D>),
}

impl<D: Clone> LocalSource<D> {
    /// Datums to index; producers are invoked on every call
    pub fn resolve(&self) -> Vec<D> {
        match self {
            Self::Literal(data) => data.clone(),
            Self::Producer(produce) => produce(),
        }
    }
}

impl<D> From<Vec<D>> for LocalSource<D> {
    fn from(data: Vec<D>) -> Self {
        Self::Literal(data)
    }
}

impl<D> fmt::Debug for LocalSource<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(data) => write!(f, "Literal({} datums)", data.len()),
            Self::Producer(_) => f.write_str("Producer"),
        }
    }
}

/// Prefetch options as supplied by the caller
pub struct PrefetchOptions<D> {
    pub url: String,
    pub cache_key: Option<String>,
    pub thumbprint: String,
    pub ttl: Duration,
    pub protocol: Option<String>,
    pub request: RequestOptions,
    pub filter: Option<Filter<D>>,
}

impl<D> PrefetchOptions<D> {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            cache_key: None,
            thumbprint: String::new(),
            ttl: DEFAULT_TTL,
            protocol: None,
            request: RequestOptions::default(),
            filter: None,
        }
    }

    pub fn cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    pub fn thumbprint(mut self, thumbprint: impl Into<String>) -> Self {
        self.thumbprint = thumbprint.into();
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Bind the cache to a protocol other than the URL's scheme
    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn request(mut self, request: RequestOptions) -> Self {
        self.request = request;
        self
    }

    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(Value) -> Vec<D> + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }
}

impl<D> From<&PrefetchSettings> for PrefetchOptions<D> {
    fn from(settings: &PrefetchSettings) -> Self {
        Self {
            url: settings.url.clone(),
            cache_key: settings.cache_key.clone(),
            thumbprint: settings.thumbprint.clone(),
            ttl: Duration::from_millis(settings.ttl_ms),
            protocol: settings.protocol.clone(),
            request: settings.request.clone(),
            filter: None,
        }
    }
}

/// Remote options as supplied by the caller
pub struct RemoteOptions<D> {
    pub url: String,
    pub wildcard: String,
    pub replace: Option<Replace>,
    pub request: RequestOptions,
    pub filter: Option<Filter<D>>,
}

impl<D> RemoteOptions<D> {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            wildcard: DEFAULT_WILDCARD.to_string(),
            replace: None,
            request: RequestOptions::default(),
            filter: None,
        }
    }

    pub fn wildcard(mut self, wildcard: impl Into<String>) -> Self {
        self.wildcard = wildcard.into();
        self
    }

    /// Build URLs with `replace(template, query)` instead of the wildcard
    pub fn replace<F>(mut self, replace: F) -> Self
    where
        F: Fn(&str, &str) -> String + Send + Sync + 'static,
    {
        self.replace = Some(Arc::new(replace));
        self
    }

    pub fn request(mut self, request: RequestOptions) -> Self {
        self.request = request;
        self
    }

    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(Value) -> Vec<D> + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }
}

impl<D> From<&RemoteSettings> for RemoteOptions<D> {
    fn from(settings: &RemoteSettings) -> Self {
        Self {
            url: settings.url.clone(),
            wildcard: settings.wildcard.clone(),
            replace: None,
            request: settings.request.clone(),
            filter: None,
        }
    }
}

/// Validated prefetch source
pub struct PrefetchDescriptor<D> {
    pub url: String,
    /// Storage namespace
    pub cache_key: String,
    /// Crate version followed by the caller's thumbprint
    pub fingerprint: String,
    pub ttl: Duration,
    /// Protocol cache entries are bound to, e.g. `https:`
    pub protocol: String,
    pub request: RequestOptions,
    pub filter: Option<Filter<D>>,
}

impl<D> PrefetchDescriptor<D> {
    pub fn parse(options: PrefetchOptions<D>) -> Result<Self> {
        if options.url.trim().is_empty() {
            return Err(Error::config("prefetch requires a url"));
        }

        let url = Url::parse(&options.url)
            .map_err(|e| Error::config(format!("invalid prefetch url '{}': {}", options.url, e)))?;

        let protocol = options
            .protocol
            .unwrap_or_else(|| format!("{}:", url.scheme()));

        Ok(Self {
            cache_key: options.cache_key.unwrap_or_else(|| options.url.clone()),
            fingerprint: format!("{}{}", crate::VERSION, options.thumbprint),
            url: options.url,
            ttl: options.ttl,
            protocol,
            request: options.request,
            filter: options.filter,
        })
    }
}

/// Validated remote source
pub struct RemoteDescriptor<D> {
    pub url: String,
    pub wildcard: String,
    pub replace: Option<Replace>,
    pub request: RequestOptions,
    pub filter: Option<Filter<D>>,
}

impl<D> RemoteDescriptor<D> {
    pub fn parse(options: RemoteOptions<D>) -> Result<Self> {
        if options.url.trim().is_empty() {
            return Err(Error::config("remote requires a url"));
        }

        if options.replace.is_none() {
            if options.wildcard.is_empty() {
                return Err(Error::config("remote wildcard must not be empty"));
            }
            if !options.url.contains(&options.wildcard) {
                return Err(Error::config(format!(
                    "remote url '{}' does not contain the wildcard '{}'",
                    options.url, options.wildcard
                )));
            }
        }

        Ok(Self {
            url: options.url,
            wildcard: options.wildcard,
            replace: options.replace,
            request: options.request,
            filter: options.filter,
        })
    }
}

/// Every configured source of an engine
pub struct Sources<D> {
    pub local: Option<LocalSource<D>>,
    pub prefetch: Option<PrefetchDescriptor<D>>,
    pub remote: Option<RemoteDescriptor<D>>,
}

impl<D> Sources<D> {
    /// Validate raw options; at least one source must be present
    pub fn parse(
        local: Option<LocalSource<D>>,
        prefetch: Option<PrefetchOptions<D>>,
        remote: Option<RemoteOptions<D>>,
    ) -> Result<Self> {
        if local.is_none() && prefetch.is_none() && remote.is_none() {
            return Err(Error::config("one of local, prefetch, or remote is required"));
        }

        Ok(Self {
            local,
            prefetch: prefetch.map(PrefetchDescriptor::parse).transpose()?,
            remote: remote.map(RemoteDescriptor::parse).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Datum = String;

    #[test]
    fn test_no_source_is_rejected() {
        let result = Sources::<Datum>::parse(None, None, None);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_local_only() {
        let sources = Sources::parse(Some(vec!["a".to_string()].into()), None, None).unwrap();
        assert!(sources.prefetch.is_none());
        assert_eq!(sources.local.unwrap().resolve(), vec!["a".to_string()]);
    }

    #[test]
    fn test_producer_is_invoked_on_resolve() {
        let local: LocalSource<Datum> = LocalSource::Producer(Arc::new(|| vec!["x".to_string()]));
        assert_eq!(local.resolve(), vec!["x".to_string()]);
    }

    #[test]
    fn test_prefetch_defaults() {
        let descriptor =
            PrefetchDescriptor::<Datum>::parse(PrefetchOptions::new("https://example.com/a.json").thumbprint("t1"))
                .unwrap();

        assert_eq!(descriptor.cache_key, "https://example.com/a.json");
        assert_eq!(descriptor.protocol, "https:");
        assert_eq!(descriptor.fingerprint, format!("{}t1", crate::VERSION));
        assert_eq!(descriptor.ttl, DEFAULT_TTL);
    }

    #[test]
    fn test_prefetch_overrides() {
        let descriptor = PrefetchDescriptor::<Datum>::parse(
            PrefetchOptions::new("http://example.com/a.json")
                .cache_key("people")
                .protocol("https:")
                .ttl(Duration::from_secs(5)),
        )
        .unwrap();

        assert_eq!(descriptor.cache_key, "people");
        assert_eq!(descriptor.protocol, "https:");
        assert_eq!(descriptor.ttl, Duration::from_secs(5));
    }

    #[test]
    fn test_prefetch_requires_valid_url() {
        assert!(PrefetchDescriptor::<Datum>::parse(PrefetchOptions::new("")).is_err());
        assert!(PrefetchDescriptor::<Datum>::parse(PrefetchOptions::new("not a url")).is_err());
    }

    #[test]
    fn test_remote_requires_wildcard_or_replace() {
        let missing = RemoteDescriptor::<Datum>::parse(RemoteOptions::new("https://example.com/search"));
        assert!(matches!(missing, Err(Error::Configuration(_))));

        let wildcard =
            RemoteDescriptor::<Datum>::parse(RemoteOptions::new("https://example.com/search?q=%QUERY"));
        assert!(wildcard.is_ok());

        let custom = RemoteDescriptor::<Datum>::parse(
            RemoteOptions::new("https://example.com/search")
                .replace(|url, q| format!("{}/{}", url, q)),
        );
        assert!(custom.is_ok());
    }

    #[test]
    fn test_malformed_remote_fails_whole_parse() {
        let result = Sources::<Datum>::parse(
            Some(LocalSource::Literal(vec![])),
            None,
            Some(RemoteOptions::new("https://example.com/search")),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_options_from_settings() {
        let settings = RemoteSettings {
            url: "https://example.com/?q=__Q__".to_string(),
            wildcard: "__Q__".to_string(),
            ..Default::default()
        };
        let descriptor = RemoteDescriptor::<Datum>::parse(RemoteOptions::from(&settings)).unwrap();
        assert_eq!(descriptor.wildcard, "__Q__");
    }
}
