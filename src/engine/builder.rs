//! Engine builder

use super::bloodhound::{Bloodhound, Inner};
use super::{Datum, DupDetector, Sorter};
use crate::cache::PrefetchCache;
use crate::config::{Settings, StorageBackend, StorageSettings, TransportSettings};
use crate::error::Result;
use crate::index::{SearchIndex, TokenIndex};
use crate::network::{HttpTransport, Transport};
use crate::remote::RemoteFetcher;
use crate::source::{LocalSource, PrefetchOptions, RemoteOptions, Sources};
use crate::storage::{FileStorage, MemoryStorage, Storage};
use crate::tokenizers::{self, DatumTokenizer, QueryTokenizer};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, warn};

/// Builder for [`Bloodhound`]
///
/// At least one of `local`, `prefetch` or `remote` must be set before
/// [`build`](BloodhoundBuilder::build).
pub struct BloodhoundBuilder<D> {
    limit: Option<usize>,
    sorter: Option<Sorter<D>>,
    dup_detector: Option<DupDetector<D>>,
    local: Option<LocalSource<D>>,
    prefetch: Option<PrefetchOptions<D>>,
    remote: Option<RemoteOptions<D>>,
    datum_tokenizer: Option<DatumTokenizer<D>>,
    query_tokenizer: Option<QueryTokenizer>,
    index: Option<Box<dyn SearchIndex<D>>>,
    storage: Option<Arc<dyn Storage>>,
    transport: Option<Arc<dyn Transport>>,
    storage_settings: StorageSettings,
    transport_settings: TransportSettings,
}

impl<D> Default for BloodhoundBuilder<D> {
    fn default() -> Self {
        Self {
            limit: None,
            sorter: None,
            dup_detector: None,
            local: None,
            prefetch: None,
            remote: None,
            datum_tokenizer: None,
            query_tokenizer: None,
            index: None,
            storage: None,
            transport: None,
            storage_settings: StorageSettings::default(),
            transport_settings: TransportSettings::default(),
        }
    }
}

impl<D: Datum> BloodhoundBuilder<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply file/env settings
    ///
    /// Sources already given to the builder are kept.
    pub fn settings(mut self, settings: &Settings) -> Self {
        self.limit = self.limit.or(Some(settings.limit));
        if self.prefetch.is_none() {
            self.prefetch = settings.prefetch.as_ref().map(PrefetchOptions::from);
        }
        if self.remote.is_none() {
            self.remote = settings.remote.as_ref().map(RemoteOptions::from);
        }
        self.storage_settings = settings.storage.clone();
        self.transport_settings = settings.transport.clone();
        self
    }

    /// Maximum number of suggestions per query (0 means the default)
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sorter<F>(mut self, sorter: F) -> Self
    where
        F: Fn(&D, &D) -> Ordering + Send + Sync + 'static,
    {
        self.sorter = Some(Arc::new(sorter));
        self
    }

    pub fn dup_detector<F>(mut self, detector: F) -> Self
    where
        F: Fn(&D, &D) -> bool + Send + Sync + 'static,
    {
        self.dup_detector = Some(Arc::new(detector));
        self
    }

    /// Local datums
    pub fn local(mut self, data: Vec<D>) -> Self {
        self.local = Some(LocalSource::Literal(data));
        self
    }

    /// Local datums produced at initialization time
    pub fn local_with<F>(mut self, produce: F) -> Self
    where
        F: Fn() -> Vec<D> + Send + Sync + 'static,
    {
        self.local = Some(LocalSource::Producer(Arc::new(produce)));
        self
    }

    pub fn prefetch(mut self, prefetch: PrefetchOptions<D>) -> Self {
        self.prefetch = Some(prefetch);
        self
    }

    pub fn remote(mut self, remote: RemoteOptions<D>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn datum_tokenizer(mut self, tokenizer: DatumTokenizer<D>) -> Self {
        self.datum_tokenizer = Some(tokenizer);
        self
    }

    pub fn query_tokenizer(mut self, tokenizer: QueryTokenizer) -> Self {
        self.query_tokenizer = Some(tokenizer);
        self
    }

    /// Replace the default [`TokenIndex`]; the tokenizers are then unused
    pub fn index<I: SearchIndex<D> + 'static>(mut self, index: I) -> Self {
        self.index = Some(Box::new(index));
        self
    }

    /// Storage backend for the prefetch cache
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Transport for prefetch and remote requests
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Validate the sources and build the engine
    pub fn build(self) -> Result<Bloodhound<D>> {
        let sources = Sources::parse(self.local, self.prefetch, self.remote)?;

        let limit = match self.limit {
            Some(0) | None => crate::DEFAULT_LIMIT,
            Some(limit) => limit,
        };

        let index: Box<dyn SearchIndex<D>> = match self.index {
            Some(index) => index,
            None => Box::new(TokenIndex::new(
                self.datum_tokenizer.unwrap_or_else(tokenizers::default_datum),
                self.query_tokenizer.unwrap_or_else(tokenizers::default_query),
            )),
        };

        let transport = if sources.prefetch.is_some() || sources.remote.is_some() {
            match self.transport {
                Some(transport) => Some(transport),
                None => Some(Arc::new(HttpTransport::with_settings(&self.transport_settings)?)
                    as Arc<dyn Transport>),
            }
        } else {
            None
        };

        // no prefetch, nothing worth persisting across sessions
        let cache = match &sources.prefetch {
            Some(prefetch) => {
                let storage = match self.storage {
                    Some(storage) => Some(storage),
                    None => open_storage(&self.storage_settings),
                };
                storage.map(|storage| PrefetchCache::new(storage, &prefetch.cache_key))
            }
            None => None,
        };

        let remote = match (sources.remote, &transport) {
            (Some(descriptor), Some(transport)) => {
                Some(RemoteFetcher::new(descriptor, Arc::clone(transport)))
            }
            _ => None,
        };

        debug!(
            "Built engine: limit={}, local={}, prefetch={}, remote={}",
            limit,
            sources.local.is_some(),
            sources.prefetch.is_some(),
            remote.is_some()
        );

        Ok(Bloodhound::from_inner(Inner::new(
            limit,
            self.sorter,
            self.dup_detector.unwrap_or_else(ignore_duplicates),
            sources.local,
            sources.prefetch,
            remote,
            transport,
            index,
            cache,
        )))
    }
}

fn ignore_duplicates<D: Datum>() -> DupDetector<D> {
    Arc::new(|_: &D, _: &D| false)
}

fn open_storage(settings: &StorageSettings) -> Option<Arc<dyn Storage>> {
    match settings.backend {
        StorageBackend::Memory => Some(Arc::new(MemoryStorage::new())),
        StorageBackend::File => {
            let storage = match &settings.dir {
                Some(dir) => FileStorage::open(dir),
                None => FileStorage::default_location(),
            };
            match storage {
                Ok(storage) => Some(Arc::new(storage)),
                Err(e) => {
                    warn!("Prefetch cache disabled: {}", e);
                    None
                }
            }
        }
    }
}
