//! Index adapter
//!
//! The engine only talks to the index through [`SearchIndex`]; [`TokenIndex`]
//! is the prefix-matching implementation used by default.

mod token_index;

pub use token_index::TokenIndex;

use crate::error::IndexError;

/// In-memory search structure backing a suggestion engine
pub trait SearchIndex<D>: Send + Sync {
    /// Add datums to the index
    fn add(&mut self, data: Vec<D>);

    /// Datums matching every token of `query`
    fn get(&self, query: &str) -> Vec<D>;

    /// Drop all indexed datums
    fn reset(&mut self);

    /// Serialize the full index state
    fn serialize(&self) -> Result<serde_json::Value, IndexError>;

    /// Replace the index state with a previously serialized one
    fn bootstrap(&mut self, blob: serde_json::Value) -> Result<(), IndexError>;

    /// Number of indexed datums
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
