//! Network transports used by ingestors.

/// Blocking JSON-over-HTTP client with retry.
pub mod http;

pub use http::{FetchClient, JsonFetch};
