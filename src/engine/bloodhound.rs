//! Engine state, initialization and the query pipeline

use super::builder::BloodhoundBuilder;
use super::{Datum, DupDetector, Sorter};
use crate::cache::PrefetchCache;
use crate::error::{InitError, TransportError};
use crate::index::SearchIndex;
use crate::network::Transport;
use crate::remote::RemoteFetcher;
use crate::source::{LocalSource, PrefetchDescriptor};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Lifecycle of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initializing,
    Ready,
}

/// How the prefetch step of an initialization settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prefetched {
    /// No prefetch source is configured
    Skipped,
    /// The index was restored from the prefetch cache
    FromCache { count: usize },
    /// The prefetch URL was fetched and indexed
    Fetched { count: usize },
}

/// Settled result of [`Bloodhound::initialize`]
pub type InitOutcome = Result<Prefetched, InitError>;

type InitFuture = Shared<BoxFuture<'static, InitOutcome>>;

pub(super) struct Inner<D> {
    limit: usize,
    sorter: Option<Sorter<D>>,
    dup_detector: DupDetector<D>,
    local: Option<LocalSource<D>>,
    prefetch: Option<PrefetchDescriptor<D>>,
    remote: Option<RemoteFetcher<D>>,
    transport: Option<Arc<dyn Transport>>,
    index: RwLock<Box<dyn SearchIndex<D>>>,
    cache: Option<PrefetchCache>,
    state: Mutex<EngineState>,
    init: Mutex<Option<InitFuture>>,
    generation: AtomicU64,
}

impl<D: Datum> Inner<D> {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        limit: usize,
        sorter: Option<Sorter<D>>,
        dup_detector: DupDetector<D>,
        local: Option<LocalSource<D>>,
        prefetch: Option<PrefetchDescriptor<D>>,
        remote: Option<RemoteFetcher<D>>,
        transport: Option<Arc<dyn Transport>>,
        index: Box<dyn SearchIndex<D>>,
        cache: Option<PrefetchCache>,
    ) -> Self {
        Self {
            limit,
            sorter,
            dup_detector,
            local,
            prefetch,
            remote,
            transport,
            index: RwLock::new(index),
            cache,
            state: Mutex::new(EngineState::Uninitialized),
            init: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    fn index_read(&self) -> RwLockReadGuard<'_, Box<dyn SearchIndex<D>>> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn index_write(&self) -> RwLockWriteGuard<'_, Box<dyn SearchIndex<D>>> {
        self.index.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: EngineState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    async fn run_initialize(self: Arc<Self>, generation: u64) -> InitOutcome {
        let outcome = match &self.prefetch {
            Some(prefetch) => self.load_prefetch(prefetch).await.map_err(InitError::from),
            None => Ok(Prefetched::Skipped),
        };

        if let Err(e) = &outcome {
            warn!("Initialization continues without prefetch data: {}", e);
        }

        // local goes in after prefetch so the prefetch reset cannot drop it
        if let Some(local) = &self.local {
            let data = local.resolve();
            debug!("Indexing {} local datums", data.len());
            self.index_write().add(data);
        }

        // a forced re-initialization that started later owns the final state
        if self.generation.load(Ordering::SeqCst) == generation {
            self.set_state(EngineState::Ready);
        }

        info!("Engine ready with {} indexed datums", self.index_read().len());
        outcome
    }

    async fn load_prefetch(
        &self,
        prefetch: &PrefetchDescriptor<D>,
    ) -> Result<Prefetched, TransportError> {
        if let Some(blob) = self
            .cache
            .as_ref()
            .and_then(|cache| cache.read(&prefetch.fingerprint, &prefetch.protocol))
        {
            let mut index = self.index_write();
            match index.bootstrap(blob) {
                Ok(()) => {
                    debug!("Prefetch for {} served from cache", prefetch.url);
                    return Ok(Prefetched::FromCache { count: index.len() });
                }
                Err(e) => warn!("Ignoring cached prefetch for {}: {}", prefetch.url, e),
            }
        }

        let transport = self.transport.as_ref().ok_or_else(|| TransportError::Request {
            url: prefetch.url.clone(),
            message: "no transport configured".to_string(),
        })?;

        info!("Prefetching {}", prefetch.url);
        let response = transport.fetch(&prefetch.url, &prefetch.request).await?;

        let data: Vec<D> = match &prefetch.filter {
            Some(filter) => filter(response),
            None => serde_json::from_value(response).map_err(|e| TransportError::Decode {
                url: prefetch.url.clone(),
                message: e.to_string(),
            })?,
        };
        let count = data.len();

        let serialized = {
            let mut index = self.index_write();
            // start from scratch, the same as a cache bootstrap would
            index.reset();
            index.add(data);
            index.serialize()
        };

        match (serialized, &self.cache) {
            (Ok(blob), Some(cache)) => {
                cache.write(blob, &prefetch.fingerprint, &prefetch.protocol, prefetch.ttl)
            }
            (Err(e), _) => warn!("Prefetched index for {} not cached: {}", prefetch.url, e),
            (Ok(_), None) => {}
        }

        Ok(Prefetched::Fetched { count })
    }

    fn sort(&self, matches: &mut [D]) {
        if let Some(sorter) = &self.sorter {
            matches.sort_by(|a, b| sorter(a, b));
        }
    }

    fn local_matches(&self, query: &str) -> Vec<D> {
        let mut matches = self.index_read().get(query);
        self.sort(&mut matches);
        matches.truncate(self.limit);
        matches
    }

    /// Remote fetcher to consult when local matches fall short of the limit
    fn backfill_for(&self, matches: &[D]) -> Option<&RemoteFetcher<D>> {
        if matches.len() < self.limit {
            self.remote.as_ref()
        } else {
            None
        }
    }

    /// Append non-duplicate remote matches until the limit is reached
    fn merge(&self, local: Vec<D>, remote: Vec<D>) -> Vec<D> {
        let mut combined = local;
        let mut candidates = remote.into_iter();

        while combined.len() < self.limit {
            let Some(candidate) = candidates.next() else {
                break;
            };

            let is_duplicate = combined
                .iter()
                .any(|existing| (self.dup_detector)(&candidate, existing));

            if !is_duplicate {
                combined.push(candidate);
            }
        }

        self.sort(&mut combined);
        combined
    }
}

/// Suggestion engine over local, prefetched and remote datums
///
/// Cloning is cheap; clones share the index, the cache and the
/// initialization state.
pub struct Bloodhound<D> {
    inner: Arc<Inner<D>>,
}

impl<D> Clone for Bloodhound<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: Datum> Bloodhound<D> {
    /// Start configuring an engine
    pub fn builder() -> BloodhoundBuilder<D> {
        BloodhoundBuilder::new()
    }

    pub(super) fn from_inner(inner: Inner<D>) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn limit(&self) -> usize {
        self.inner.limit
    }

    pub fn state(&self) -> EngineState {
        *self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load prefetch data, then local data
    ///
    /// The first call starts the load; later calls share its outcome unless
    /// `force` is set, in which case the load runs again. A failed prefetch
    /// is reported here but still leaves the engine ready with whatever
    /// local data exists.
    pub async fn initialize(&self, force: bool) -> InitOutcome {
        let init = {
            let mut slot = self.inner.init.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(init) if !force => init.clone(),
                _ => {
                    let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
                    self.inner.set_state(EngineState::Initializing);

                    let init = Arc::clone(&self.inner)
                        .run_initialize(generation)
                        .boxed()
                        .shared();
                    *slot = Some(init.clone());
                    init
                }
            }
        };

        init.await
    }

    /// Add datums to the index
    pub fn add(&self, data: Vec<D>) {
        self.inner.index_write().add(data);
    }

    /// Empty the index
    pub fn clear(&self) {
        self.inner.index_write().reset();
    }

    /// Number of indexed datums
    pub fn len(&self) -> usize {
        self.inner.index_read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the persisted prefetch data
    pub fn clear_prefetch_cache(&self) {
        if let Some(cache) = &self.inner.cache {
            cache.clear();
        }
    }

    /// Drop cached remote responses held by the transport
    pub fn clear_remote_cache(&self) {
        if let Some(remote) = &self.inner.remote {
            remote.transport().reset_cache();
        }
    }

    /// Best matches for `query`, backfilled from the remote source when
    /// the index has fewer than `limit` matches
    ///
    /// Remote failures degrade to the local matches.
    pub async fn get(&self, query: &str) -> Vec<D> {
        let matches = self.inner.local_matches(query);

        match self.inner.backfill_for(&matches) {
            Some(remote) => {
                let remote_matches = remote.fetch(query).await;
                self.inner.merge(matches, remote_matches)
            }
            None => matches,
        }
    }

    /// Like [`get`](Self::get), but a failed remote lookup is returned as an error
    pub async fn try_get(&self, query: &str) -> Result<Vec<D>, TransportError> {
        let matches = self.inner.local_matches(query);

        match self.inner.backfill_for(&matches) {
            Some(remote) => {
                let remote_matches = remote.try_fetch(query).await?;
                Ok(self.inner.merge(matches, remote_matches))
            }
            None => Ok(matches),
        }
    }

    /// Callback form of [`get`](Self::get)
    ///
    /// The callback runs at most once. Without a backfill it only runs when
    /// there is at least one match or no remote source could ever answer.
    pub async fn get_with<F>(&self, query: &str, callback: F)
    where
        F: FnOnce(Vec<D>),
    {
        let matches = self.inner.local_matches(query);

        if let Some(remote) = self.inner.backfill_for(&matches) {
            let remote_matches = remote.fetch(query).await;
            callback(self.inner.merge(matches, remote_matches));
            return;
        }

        if !matches.is_empty() || self.inner.remote.is_none() {
            callback(matches);
        }
    }
}
