use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::config::{IngestPaths, StoreDetailsOptions};
use crate::constants::columns::APP_ID;
use crate::constants::steam_store::{
    APP_DETAILS_ENDPOINT, APP_DETAILS_STEM, BASE_URL, DEFAULT_REQUEST_DELAY_SECS,
    IDENTIFIER_FROM_APP_LIST, SOURCE_NAME,
};
use crate::constants::steam_web;
use crate::errors::IngestError;
use crate::source::{IngestContext, IngestReport, Ingestor};
use crate::store::tabular::load_table;
use crate::table::Table;
use crate::transport::JsonFetch;
use crate::types::AppId;

/// Steam Store per-app details, fetched incrementally.
///
/// Each run enriches the app ids of a catalog table that are not yet present
/// in the persisted `app_details` table, at most `limit` per run, then merges
/// the new rows into that table. Once persisted, an app is not fetched again.
pub struct SteamStoreIngestor {
    ctx: IngestContext,
    request_delay: Duration,
    options: StoreDetailsOptions,
}

#[derive(Serialize)]
struct DetailsPayload<'a> {
    apps: &'a [Value],
    meta: DetailsMeta<'a>,
}

#[derive(Serialize)]
struct DetailsMeta<'a> {
    source: String,
    count: usize,
    cc: &'a str,
    language: &'a str,
}

impl SteamStoreIngestor {
    /// Ingestor talking to the public Steam Store API.
    pub fn new(paths: &IngestPaths) -> Self {
        Self {
            ctx: IngestContext::http(SOURCE_NAME, BASE_URL, paths),
            request_delay: Duration::from_secs_f64(DEFAULT_REQUEST_DELAY_SECS),
            options: StoreDetailsOptions::default(),
        }
    }

    /// Ingestor using a caller-supplied transport.
    pub fn with_fetch(fetch: Box<dyn JsonFetch>, paths: &IngestPaths) -> Self {
        Self {
            ctx: IngestContext::with_fetch(SOURCE_NAME, fetch, paths),
            request_delay: Duration::from_secs_f64(DEFAULT_REQUEST_DELAY_SECS),
            options: StoreDetailsOptions::default(),
        }
    }

    /// Pause between two detail requests. Zero disables the pause.
    pub fn with_request_delay(mut self, request_delay: Duration) -> Self {
        self.request_delay = request_delay;
        self
    }

    /// Replace the options used by [`Ingestor::ingest`].
    pub fn with_options(mut self, options: StoreDetailsOptions) -> Self {
        self.options = options;
        self
    }

    /// Catalog table read when the options name none: the Steam Web app list.
    pub fn default_app_list_path(&self) -> PathBuf {
        self.ctx
            .tables()
            .path_for(steam_web::SOURCE_NAME, steam_web::IDENTIFIER_APP_LIST)
    }

    /// Persisted details table merged into on every run.
    pub fn details_path(&self) -> PathBuf {
        self.ctx.table_path(APP_DETAILS_STEM)
    }

    /// Fetch details for the next batch of catalog apps not yet persisted.
    pub fn ingest_from_app_list(
        &self,
        options: &StoreDetailsOptions,
    ) -> Result<IngestReport, IngestError> {
        let app_list_path = options
            .app_list_path
            .clone()
            .unwrap_or_else(|| self.default_app_list_path());
        let all_appids = load_catalog_appids(&app_list_path)?;
        info!(
            parent: self.ctx.span(),
            "loaded {} app ids from {}",
            all_appids.len(),
            app_list_path.display()
        );

        let details_path = self.details_path();
        let existing = if details_path.exists() {
            info!(
                parent: self.ctx.span(),
                "loading existing store details from {}",
                details_path.display()
            );
            Some(load_keyed_table(&details_path)?)
        } else {
            None
        };
        let present: HashSet<AppId> = existing
            .as_ref()
            .map(|table| appid_values(table).collect())
            .unwrap_or_default();

        let remaining: Vec<AppId> = all_appids
            .into_iter()
            .filter(|appid| !present.contains(appid))
            .collect();
        if remaining.is_empty() {
            info!(
                parent: self.ctx.span(),
                "all apps from {} already have store details in {}",
                app_list_path.display(),
                details_path.display()
            );
            return Ok(IngestReport {
                table_rows: existing.map(|table| table.len()).unwrap_or(0),
                ..IngestReport::default()
            });
        }

        let targets = match options.limit {
            Some(limit) => &remaining[..limit.min(remaining.len())],
            None => &remaining[..],
        };
        info!(
            parent: self.ctx.span(),
            "fetching store details for {} apps (remaining total: {})",
            targets.len(),
            remaining.len()
        );

        let mut results: Vec<Value> = Vec::with_capacity(targets.len());
        for (idx, appid) in targets.iter().enumerate() {
            info!(parent: self.ctx.span(), "[{}/{}] appid={appid}", idx + 1, targets.len());
            if let Some(details) =
                self.fetch_single_app(*appid, &options.country_code, &options.language)?
            {
                results.push(details);
            }
            if idx + 1 < targets.len() && !self.request_delay.is_zero() {
                thread::sleep(self.request_delay);
            }
        }

        let payload = serde_json::to_value(DetailsPayload {
            apps: &results,
            meta: DetailsMeta {
                source: app_list_path.display().to_string(),
                count: results.len(),
                cc: &options.country_code,
                language: &options.language,
            },
        })?;
        let raw_path = self.ctx.save_raw(APP_DETAILS_STEM, &payload)?;

        let mut fresh = Table::from_records(&results);
        fresh.ensure_column(APP_ID);
        let merged = merge_details(existing, fresh);
        let table_path = self.ctx.save_table(APP_DETAILS_STEM, &merged)?;

        Ok(IngestReport {
            raw_path: Some(raw_path),
            table_path: Some(table_path),
            fetched: results.len(),
            table_rows: merged.len(),
        })
    }

    /// Details object for `appid`, or `None` when the store reports no success.
    fn fetch_single_app(
        &self,
        appid: AppId,
        country_code: &str,
        language: &str,
    ) -> Result<Option<Value>, IngestError> {
        let mut payload = self.ctx.get(
            APP_DETAILS_ENDPOINT,
            &[
                ("appids", appid.to_string()),
                ("cc", country_code.to_string()),
                ("l", language.to_string()),
            ],
        )?;

        let entry = payload.get_mut(appid.to_string().as_str()).map(Value::take);
        let succeeded = entry
            .as_ref()
            .and_then(|entry| entry.get("success"))
            .is_some_and(is_truthy);
        if !succeeded {
            warn!(parent: self.ctx.span(), "no store data for appid={appid}");
            return Ok(None);
        }

        let mut details = match entry.and_then(|mut entry| entry.get_mut("data").map(Value::take)) {
            Some(Value::Object(details)) => details,
            _ => Map::new(),
        };
        details.insert(APP_ID.to_string(), Value::from(appid));
        Ok(Some(Value::Object(details)))
    }
}

impl Ingestor for SteamStoreIngestor {
    fn source_name(&self) -> &str {
        self.ctx.source_name()
    }

    fn identifiers(&self) -> &'static [&'static str] {
        &[IDENTIFIER_FROM_APP_LIST]
    }

    fn ingest(&self, identifier: &str) -> Result<IngestReport, IngestError> {
        match identifier {
            IDENTIFIER_FROM_APP_LIST => self.ingest_from_app_list(&self.options),
            other => Err(self.ctx.unknown_identifier(other)),
        }
    }
}

/// Ascending, deduplicated app ids of a catalog table. Null ids are dropped.
pub fn load_catalog_appids(path: &Path) -> Result<Vec<AppId>, IngestError> {
    if !path.exists() {
        return Err(IngestError::MissingInput {
            path: path.to_path_buf(),
            hint: "Run the steam_web app_list ingest first.".to_string(),
        });
    }
    let table = load_keyed_table(path)?;
    let ids: BTreeSet<AppId> = appid_values(&table).collect();
    Ok(ids.into_iter().collect())
}

/// Existing rows first, new rows after; on a repeated `appid` the last row wins.
pub fn merge_details(existing: Option<Table>, fresh: Table) -> Table {
    match existing {
        Some(existing) if !existing.is_empty() => existing.concat(fresh).dedup_keep_last(APP_ID),
        _ => fresh,
    }
}

fn load_keyed_table(path: &Path) -> Result<Table, IngestError> {
    let table = load_table(path)?;
    if !table.has_column(APP_ID) {
        return Err(IngestError::MissingColumn {
            path: path.to_path_buf(),
            column: APP_ID.to_string(),
        });
    }
    Ok(table)
}

fn appid_values(table: &Table) -> impl Iterator<Item = AppId> + '_ {
    table.column_values(APP_ID).filter_map(as_appid)
}

fn as_appid(value: &Value) -> Option<AppId> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|float| float.fract() == 0.0)
                .map(|float| float as AppId)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}
