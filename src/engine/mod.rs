//! Suggestion engine
//!
//! Combines local, prefetched and remote datums behind one index and a
//! merge/rank/limit pipeline.

mod bloodhound;
mod builder;

pub use bloodhound::{Bloodhound, EngineState, InitOutcome, Prefetched};
pub use builder::BloodhoundBuilder;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;

/// Bounds every suggestion record must satisfy
pub trait Datum: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Datum for T where T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Orders matches before they are limited and delivered
pub type Sorter<D> = Arc<dyn Fn(&D, &D) -> Ordering + Send + Sync>;

/// Decides whether `(candidate, existing)` are the same suggestion
pub type DupDetector<D> = Arc<dyn Fn(&D, &D) -> bool + Send + Sync>;
