#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Command-line runners for the ingest binaries.
pub mod apps;
/// Paths, retry policy, and per-source ingest options.
pub mod config;
/// Centralized constants used across sources, stores, and the fetch client.
pub mod constants;
/// API key resolution from the environment and YAML config files.
pub mod credentials;
/// Ingestor trait, shared context, and the Steam sources.
pub mod source;
/// Raw JSON and Parquet table persistence.
pub mod store;
/// Flattened row tables and column type inference.
pub mod table;
/// Network transports used by sources.
pub mod transport;
/// Shared type aliases.
pub mod types;

mod errors;

pub use config::{AppListOptions, IngestPaths, RetryPolicy, StoreDetailsOptions};
pub use credentials::ApiKeyResolver;
pub use errors::IngestError;
pub use source::{
    IngestContext, IngestReport, Ingestor, SteamSpyIngestor, SteamStoreIngestor,
    SteamWebIngestor,
};
pub use store::{RawStore, TableStore};
pub use table::{ColumnKind, Row, Table};
pub use transport::{FetchClient, JsonFetch};
pub use types::{AppId, ColumnName, Identifier, SourceName};
