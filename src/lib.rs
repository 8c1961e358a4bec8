//! Bloodhound-RS: a suggestion engine for typeahead-style lookups
//!
//! Suggestions come from up to three sources: local datums, a JSON document
//! prefetched once (and persisted between sessions), and a remote endpoint
//! queried when the index cannot fill the requested number of suggestions.
//! All sources feed one token index; queries are merged, deduplicated,
//! sorted and limited in a fixed order.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod network;
pub mod remote;
pub mod source;
pub mod storage;
pub mod tokenizers;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Settings;
pub use engine::{Bloodhound, BloodhoundBuilder, Datum, EngineState, Prefetched};
pub use error::{Error, Result};
pub use source::{PrefetchOptions, RemoteOptions};

/// Library version; part of every prefetch cache fingerprint
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of suggestions returned when no limit is configured
pub const DEFAULT_LIMIT: usize = 5;
