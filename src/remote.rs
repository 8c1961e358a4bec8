//! Remote lookups

use crate::error::TransportError;
use crate::network::Transport;
use crate::source::RemoteDescriptor;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

/// Issues query-shaped requests for a remote source
pub struct RemoteFetcher<D> {
    descriptor: RemoteDescriptor<D>,
    transport: Arc<dyn Transport>,
}

impl<D: DeserializeOwned> RemoteFetcher<D> {
    pub fn new(descriptor: RemoteDescriptor<D>, transport: Arc<dyn Transport>) -> Self {
        Self {
            descriptor,
            transport,
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// URL for `query`
    pub fn url_for(&self, query: &str) -> String {
        match &self.descriptor.replace {
            Some(replace) => replace(&self.descriptor.url, query),
            None => self.descriptor.url.replacen(
                &self.descriptor.wildcard,
                &urlencoding::encode(query),
                1,
            ),
        }
    }

    /// Matches for `query`, or the transport failure
    pub async fn try_fetch(&self, query: &str) -> Result<Vec<D>, TransportError> {
        let url = self.url_for(query);
        let response = self.transport.fetch(&url, &self.descriptor.request).await?;

        match &self.descriptor.filter {
            Some(filter) => Ok(filter(response)),
            None => serde_json::from_value(response).map_err(|e| TransportError::Decode {
                url,
                message: e.to_string(),
            }),
        }
    }

    /// Matches for `query`; any failure yields no matches
    pub async fn fetch(&self, query: &str) -> Vec<D> {
        match self.try_fetch(query).await {
            Ok(matches) => {
                debug!("Remote returned {} matches for '{}'", matches.len(), query);
                matches
            }
            Err(e) => {
                warn!("Remote lookup for '{}' failed: {}", query, e);
                Vec::new()
            }
        }
    }
}
