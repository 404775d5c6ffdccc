//! Ingestor interface and the shared fetch/persist context.
//!
//! Ownership model:
//! - `Ingestor` is the per-source capability: `ingest(identifier)` runs one
//!   complete fetch-and-persist pass for a supported identifier.
//! - `IngestContext` owns everything an ingestor needs besides its options: the
//!   `JsonFetch` transport, the raw and table stores, and the span its log
//!   events are attached to. Ingestors hold no other mutable state.

use std::path::PathBuf;

use serde_json::Value;
use tracing::{Span, info, info_span};

use crate::config::IngestPaths;
use crate::errors::IngestError;
use crate::store::{RawStore, TableStore};
use crate::table::Table;
use crate::transport::{FetchClient, JsonFetch};
use crate::types::SourceName;

/// Source implementation modules.
pub mod sources;

pub use sources::steam_spy::SteamSpyIngestor;
pub use sources::steam_store::SteamStoreIngestor;
pub use sources::steam_web::SteamWebIngestor;

/// Outcome of one ingest pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Raw payload written this run, if any.
    pub raw_path: Option<PathBuf>,
    /// Table written this run, if any.
    pub table_path: Option<PathBuf>,
    /// Records fetched from the network this run.
    pub fetched: usize,
    /// Rows in the table as persisted.
    pub table_rows: usize,
}

impl IngestReport {
    /// True when the run made no writes.
    pub fn is_noop(&self) -> bool {
        self.raw_path.is_none() && self.table_path.is_none()
    }
}

/// Per-source ingestion capability.
pub trait Ingestor {
    /// Source namespace used for output paths and logging.
    fn source_name(&self) -> &str;
    /// Identifiers accepted by [`Ingestor::ingest`].
    fn identifiers(&self) -> &'static [&'static str];
    /// Fetch and persist the dataset named by `identifier`.
    fn ingest(&self, identifier: &str) -> Result<IngestReport, IngestError>;
}

/// Fetch transport, stores, and log span shared by one ingestor.
pub struct IngestContext {
    source_name: SourceName,
    fetch: Box<dyn JsonFetch>,
    raw: RawStore,
    tables: TableStore,
    span: Span,
}

impl IngestContext {
    /// Context backed by a real HTTP client for `base_url`.
    pub fn http(source_name: &str, base_url: &str, paths: &IngestPaths) -> Self {
        let span = info_span!("ingestor", source = source_name);
        let client = FetchClient::new(base_url).with_span(span.clone());
        Self::build(source_name, Box::new(client), paths, span)
    }

    /// Context with a caller-supplied transport.
    pub fn with_fetch(source_name: &str, fetch: Box<dyn JsonFetch>, paths: &IngestPaths) -> Self {
        let span = info_span!("ingestor", source = source_name);
        Self::build(source_name, fetch, paths, span)
    }

    fn build(
        source_name: &str,
        fetch: Box<dyn JsonFetch>,
        paths: &IngestPaths,
        span: Span,
    ) -> Self {
        info!(parent: &span, "initialized ingestor");
        Self {
            source_name: source_name.to_string(),
            fetch,
            raw: RawStore::new(&paths.raw_root),
            tables: TableStore::new(&paths.table_root),
            span,
        }
    }

    /// Source namespace.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Span every log event of this ingestor is recorded under.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Table store, for reading previously persisted output.
    pub fn tables(&self) -> &TableStore {
        &self.tables
    }

    /// GET `endpoint` relative to the source base URL.
    pub fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, IngestError> {
        self.fetch.get_json(endpoint, params)
    }

    /// Persist the raw payload under this source.
    pub fn save_raw(&self, identifier: &str, payload: &Value) -> Result<PathBuf, IngestError> {
        let path = self.raw.save_raw(&self.source_name, identifier, payload)?;
        info!(parent: &self.span, "saved raw data -> {}", path.display());
        Ok(path)
    }

    /// Persist a table under this source.
    pub fn save_table(&self, identifier: &str, table: &Table) -> Result<PathBuf, IngestError> {
        let path = self.tables.save_table(&self.source_name, identifier, table)?;
        info!(
            parent: &self.span,
            "saved parquet ({} rows) -> {}",
            table.len(),
            path.display()
        );
        Ok(path)
    }

    /// Location a table for `identifier` is written to.
    pub fn table_path(&self, identifier: &str) -> PathBuf {
        self.tables.path_for(&self.source_name, identifier)
    }

    /// Error for an identifier the ingestor does not support.
    pub fn unknown_identifier(&self, identifier: &str) -> IngestError {
        IngestError::UnknownIdentifier {
            source_name: self.source_name.clone(),
            identifier: identifier.to_string(),
        }
    }
}
