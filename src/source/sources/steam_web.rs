use serde_json::{Value, json};
use tracing::{debug, info};

use crate::config::{AppListOptions, IngestPaths};
use crate::constants::columns::APP_ID;
use crate::constants::steam_web::{APP_LIST_ENDPOINT, BASE_URL, IDENTIFIER_APP_LIST, SOURCE_NAME};
use crate::credentials::ApiKeyResolver;
use crate::errors::IngestError;
use crate::source::{IngestContext, IngestReport, Ingestor};
use crate::table::Table;
use crate::transport::JsonFetch;

/// Steam Web API app list (`IStoreService/GetAppList/v1`).
///
/// Requires an API key. Pages are requested with `last_appid` set to the last
/// app id of the previous page. A page shorter than `page_size` is the last
/// one; a full page always triggers one more request, so a catalog whose size
/// is an exact multiple of `page_size` ends with an empty page.
pub struct SteamWebIngestor {
    ctx: IngestContext,
    keys: ApiKeyResolver,
    options: AppListOptions,
}

impl SteamWebIngestor {
    /// Ingestor talking to the public Steam Web API.
    pub fn new(paths: &IngestPaths, keys: ApiKeyResolver) -> Self {
        Self {
            ctx: IngestContext::http(SOURCE_NAME, BASE_URL, paths),
            keys,
            options: AppListOptions::default(),
        }
    }

    /// Ingestor using a caller-supplied transport.
    pub fn with_fetch(fetch: Box<dyn JsonFetch>, paths: &IngestPaths, keys: ApiKeyResolver) -> Self {
        Self {
            ctx: IngestContext::with_fetch(SOURCE_NAME, fetch, paths),
            keys,
            options: AppListOptions::default(),
        }
    }

    /// Replace the options used by [`Ingestor::ingest`].
    pub fn with_options(mut self, options: AppListOptions) -> Self {
        self.options = options;
        self
    }

    /// Page through the full app list and persist raw JSON plus the table.
    pub fn ingest_app_list(&self, options: AppListOptions) -> Result<IngestReport, IngestError> {
        if options.page_size == 0 {
            return Err(IngestError::Configuration(
                "page size must be greater than zero".to_string(),
            ));
        }
        let api_key = self.keys.resolve()?;
        let apps = self.fetch_all_pages(&api_key, options)?;
        info!(parent: self.ctx.span(), "fetched {} apps", apps.len());

        let table = {
            let mut table = Table::from_records(&apps);
            table.ensure_column(APP_ID);
            table
        };
        let payload = json!({ "apps": apps });

        let raw_path = self.ctx.save_raw(IDENTIFIER_APP_LIST, &payload)?;
        let table_path = self.ctx.save_table(IDENTIFIER_APP_LIST, &table)?;

        Ok(IngestReport {
            raw_path: Some(raw_path),
            table_path: Some(table_path),
            fetched: table.len(),
            table_rows: table.len(),
        })
    }

    fn fetch_all_pages(
        &self,
        api_key: &str,
        options: AppListOptions,
    ) -> Result<Vec<Value>, IngestError> {
        let mut all_apps: Vec<Value> = Vec::new();
        let mut last_appid: i64 = 0;
        loop {
            let response = self.ctx.get(
                APP_LIST_ENDPOINT,
                &[
                    ("key", api_key.to_string()),
                    ("max_results", options.page_size.to_string()),
                    ("last_appid", last_appid.to_string()),
                    ("include_dlc", options.include_dlc.to_string()),
                ],
            )?;

            let page = page_apps(response);
            if page.is_empty() {
                break;
            }
            let page_len = page.len();
            last_appid = page
                .last()
                .and_then(|app| app.get(APP_ID))
                .and_then(Value::as_i64)
                .ok_or_else(|| IngestError::UnexpectedPayload {
                    source_name: SOURCE_NAME.to_string(),
                    details: "last app of a page has no integer appid".to_string(),
                })?;
            all_apps.extend(page);
            debug!(
                parent: self.ctx.span(),
                "page of {page_len} apps, cursor now {last_appid}, {} total",
                all_apps.len()
            );

            if page_len < options.page_size {
                break;
            }
        }
        Ok(all_apps)
    }
}

impl Ingestor for SteamWebIngestor {
    fn source_name(&self) -> &str {
        self.ctx.source_name()
    }

    fn identifiers(&self) -> &'static [&'static str] {
        &[IDENTIFIER_APP_LIST]
    }

    fn ingest(&self, identifier: &str) -> Result<IngestReport, IngestError> {
        match identifier {
            IDENTIFIER_APP_LIST => self.ingest_app_list(self.options),
            other => Err(self.ctx.unknown_identifier(other)),
        }
    }
}

/// Entries at `response.apps`; anything missing reads as an empty page.
fn page_apps(mut response: Value) -> Vec<Value> {
    match response
        .get_mut("response")
        .and_then(|inner| inner.get_mut("apps"))
        .map(Value::take)
    {
        Some(Value::Array(apps)) => apps,
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::ScriptedFetch;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn page(start: i64, len: usize) -> Value {
        let apps: Vec<Value> = (0..len as i64)
            .map(|offset| {
                let appid = start + offset * 10;
                json!({"appid": appid, "name": format!("app {appid}")})
            })
            .collect();
        json!({"response": {"apps": apps}})
    }

    fn keyed_resolver(temp: &TempDir) -> ApiKeyResolver {
        let file = temp.path().join("keys.yaml");
        fs::write(&file, "auth:\n  api_key: test-key\n").unwrap();
        ApiKeyResolver::new("STEAM_INGEST_TEST_UNSET_KEY_VAR")
            .with_file_fields(file, &[&["auth", "api_key"]])
    }

    fn ingestor(temp: &TempDir, fetch: &ScriptedFetch) -> SteamWebIngestor {
        let paths = IngestPaths::from_data_dir(temp.path().join("data"));
        SteamWebIngestor::with_fetch(Box::new(fetch.clone()), &paths, keyed_resolver(temp))
    }

    #[test]
    fn short_last_page_ends_pagination() {
        let temp = tempdir().unwrap();
        let fetch = ScriptedFetch::new([page(10, 3), page(40, 3), page(70, 2)]);
        let options = AppListOptions {
            include_dlc: true,
            page_size: 3,
        };

        let report = ingestor(&temp, &fetch).ingest_app_list(options).unwrap();

        let calls = fetch.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(report.fetched, 2 * 3 + 2);
        let cursors: Vec<&str> = calls
            .iter()
            .map(|call| call.param("last_appid").unwrap())
            .collect();
        assert_eq!(cursors, vec!["0", "30", "60"]);
        assert!(calls.iter().all(|call| call.endpoint == APP_LIST_ENDPOINT));
        assert_eq!(calls[0].param("key"), Some("test-key"));
        assert_eq!(calls[0].param("max_results"), Some("3"));
        assert_eq!(calls[0].param("include_dlc"), Some("true"));
    }

    #[test]
    fn exact_multiple_of_page_size_costs_one_empty_request() {
        let temp = tempdir().unwrap();
        let fetch = ScriptedFetch::new([
            page(10, 3),
            page(40, 3),
            page(70, 3),
            json!({"response": {"apps": []}}),
        ]);
        let options = AppListOptions {
            include_dlc: false,
            page_size: 3,
        };

        let report = ingestor(&temp, &fetch).ingest_app_list(options).unwrap();

        let calls = fetch.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[3].param("last_appid"), Some("90"));
        assert_eq!(calls[0].param("include_dlc"), Some("false"));
        assert_eq!(report.fetched, 9);
    }

    #[test]
    fn empty_response_object_ends_pagination() {
        let temp = tempdir().unwrap();
        let fetch = ScriptedFetch::new([json!({"response": {}})]);

        let report = ingestor(&temp, &fetch)
            .ingest_app_list(AppListOptions::default())
            .unwrap();

        assert_eq!(fetch.calls().len(), 1);
        assert_eq!(report.fetched, 0);
        let table = crate::store::tabular::load_table(&report.table_path.unwrap()).unwrap();
        assert!(table.is_empty());
        assert!(table.has_column("appid"));
    }

    #[test]
    fn outputs_hold_accumulated_apps() {
        let temp = tempdir().unwrap();
        let fetch = ScriptedFetch::new([page(10, 2), page(30, 1)]);
        let ingestor = ingestor(&temp, &fetch).with_options(AppListOptions {
            include_dlc: true,
            page_size: 2,
        });

        let report = ingestor.ingest("app_list").unwrap();

        assert_eq!(fetch.calls().len(), 2);
        assert_eq!(report.fetched, 3);
        let raw: Value =
            serde_json::from_slice(&fs::read(report.raw_path.unwrap()).unwrap()).unwrap();
        assert_eq!(raw["apps"].as_array().unwrap().len(), report.fetched);
        let table = crate::store::tabular::load_table(&report.table_path.unwrap()).unwrap();
        assert_eq!(table.len(), report.fetched);
        assert_eq!(table.columns().collect::<Vec<_>>(), vec!["appid", "name"]);
    }

    #[test]
    fn missing_key_fails_before_any_request() {
        let temp = tempdir().unwrap();
        let fetch = ScriptedFetch::new([page(10, 1)]);
        let paths = IngestPaths::from_data_dir(temp.path());
        let keys = ApiKeyResolver::new("STEAM_INGEST_TEST_UNSET_KEY_VAR")
            .with_file_fields(temp.path().join("absent.yaml"), &[&["api_key"]]);
        let ingestor = SteamWebIngestor::with_fetch(Box::new(fetch.clone()), &paths, keys);

        let err = ingestor.ingest("app_list").unwrap_err();

        assert!(matches!(err, IngestError::Configuration(_)));
        assert!(fetch.calls().is_empty());
    }
}
