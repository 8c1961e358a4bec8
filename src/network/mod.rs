//! HTTP networking module
//!
//! The engine reaches the network only through [`Transport`]. [`HttpTransport`]
//! is the reqwest-backed implementation; it owns response caching, coalescing
//! of identical in-flight requests and request throttling.

mod client;
mod transport;

pub use client::HttpTransport;
pub use transport::{HttpMethod, RequestOptions, Transport};
