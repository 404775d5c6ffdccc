use serde_json::{Map, Value};
use tracing::info;

use crate::config::IngestPaths;
use crate::constants::columns::APP_ID;
use crate::constants::steam_spy::{BASE_URL, IDENTIFIER_ALL, SOURCE_NAME};
use crate::errors::IngestError;
use crate::source::{IngestContext, IngestReport, Ingestor};
use crate::table::{Table, flatten_object};
use crate::transport::JsonFetch;
use crate::types::AppId;

/// SteamSpy aggregate statistics.
///
/// The `all` request returns one object keyed by app id text:
/// `{"10": {"appid": 10, "name": "...", "owners": "...", ...}, ...}`.
/// Each run fetches it wholesale and overwrites both outputs.
pub struct SteamSpyIngestor {
    ctx: IngestContext,
}

impl SteamSpyIngestor {
    /// Ingestor talking to the public SteamSpy API.
    pub fn new(paths: &IngestPaths) -> Self {
        Self {
            ctx: IngestContext::http(SOURCE_NAME, BASE_URL, paths),
        }
    }

    /// Ingestor using a caller-supplied transport.
    pub fn with_fetch(fetch: Box<dyn JsonFetch>, paths: &IngestPaths) -> Self {
        Self {
            ctx: IngestContext::with_fetch(SOURCE_NAME, fetch, paths),
        }
    }

    /// Fetch the `all` dataset and persist raw JSON plus the flattened table.
    pub fn ingest_all(&self) -> Result<IngestReport, IngestError> {
        info!(parent: self.ctx.span(), "fetching SteamSpy `all` dataset");
        let payload = self.ctx.get("", &[("request", IDENTIFIER_ALL.to_string())])?;

        let raw_path = self.ctx.save_raw(IDENTIFIER_ALL, &payload)?;

        let Value::Object(apps) = &payload else {
            return Err(IngestError::UnexpectedPayload {
                source_name: SOURCE_NAME.to_string(),
                details: "expected an object keyed by app id".to_string(),
            });
        };
        let table = stats_table(apps)?;
        let table_path = self.ctx.save_table(IDENTIFIER_ALL, &table)?;

        Ok(IngestReport {
            raw_path: Some(raw_path),
            table_path: Some(table_path),
            fetched: table.len(),
            table_rows: table.len(),
        })
    }
}

impl Ingestor for SteamSpyIngestor {
    fn source_name(&self) -> &str {
        self.ctx.source_name()
    }

    fn identifiers(&self) -> &'static [&'static str] {
        &[IDENTIFIER_ALL]
    }

    fn ingest(&self, identifier: &str) -> Result<IngestReport, IngestError> {
        match identifier {
            IDENTIFIER_ALL => self.ingest_all(),
            other => Err(self.ctx.unknown_identifier(other)),
        }
    }
}

/// One row per object-valued entry; `appid` comes from the map key.
fn stats_table(apps: &Map<String, Value>) -> Result<Table, IngestError> {
    let mut table = Table::new();
    table.ensure_column(APP_ID);
    for (key, record) in apps {
        let Value::Object(fields) = record else {
            continue;
        };
        let appid: AppId = key.trim().parse().map_err(|_| IngestError::UnexpectedPayload {
            source_name: SOURCE_NAME.to_string(),
            details: format!("app id key '{key}' is not an integer"),
        })?;
        let mut row = Map::new();
        row.insert(APP_ID.to_string(), Value::from(appid));
        for (column, value) in flatten_object(fields) {
            if column != APP_ID {
                row.insert(column, value);
            }
        }
        table.push_row(row);
    }
    Ok(table)
}
