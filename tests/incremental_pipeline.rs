use std::collections::VecDeque;
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use steam_ingest::{
    ApiKeyResolver, AppListOptions, IngestError, IngestPaths, Ingestor, JsonFetch,
    SteamStoreIngestor, SteamWebIngestor, StoreDetailsOptions, TableStore,
};
use tempfile::tempdir;

/// Answers app list pages and detail requests from fixed data.
#[derive(Clone, Default)]
struct FakeSteam {
    pages: Arc<Mutex<VecDeque<Value>>>,
    detail_requests: Arc<Mutex<Vec<i64>>>,
}

impl FakeSteam {
    fn with_pages(pages: Vec<Value>) -> Self {
        let fake = Self::default();
        fake.pages.lock().unwrap().extend(pages);
        fake
    }

    fn detail_requests(&self) -> Vec<i64> {
        self.detail_requests.lock().unwrap().clone()
    }
}

impl JsonFetch for FakeSteam {
    fn get_json(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, IngestError> {
        if endpoint == "/appdetails" {
            let appid: i64 = params
                .iter()
                .find(|(key, _)| *key == "appids")
                .and_then(|(_, value)| value.parse().ok())
                .unwrap();
            self.detail_requests.lock().unwrap().push(appid);
            if appid % 5 == 0 {
                return Ok(json!({ appid.to_string(): {"success": false} }));
            }
            return Ok(json!({
                appid.to_string(): {
                    "success": true,
                    "data": {
                        "name": format!("app {appid}"),
                        "is_free": appid % 2 == 0,
                        "release_date": {"coming_soon": false, "date": "1 Jan, 2020"},
                    }
                }
            }));
        }
        Ok(self
            .pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| json!({"response": {}})))
    }
}

fn app_page(appids: &[i64]) -> Value {
    let apps: Vec<Value> = appids
        .iter()
        .map(|appid| json!({"appid": appid, "name": format!("app {appid}"), "last_modified": 1_700_000_000}))
        .collect();
    json!({"response": {"apps": apps}})
}

fn persisted_detail_ids(paths: &IngestPaths) -> Vec<i64> {
    let table = TableStore::new(&paths.table_root)
        .load("steam_store", "app_details")
        .unwrap();
    let mut ids: Vec<i64> = table
        .column_values("appid")
        .filter_map(Value::as_i64)
        .collect();
    ids.sort_unstable();
    ids
}

#[test]
fn app_list_feeds_repeated_detail_runs_until_exhausted() {
    let temp = tempdir().unwrap();
    let paths = IngestPaths::from_data_dir(temp.path().join("data"));
    let key_file = temp.path().join("steam_web_api.local.yaml");
    fs::write(&key_file, "steam:\n  api_key: integration-key\n").unwrap();
    let keys = ApiKeyResolver::new("STEAM_INGEST_TEST_UNSET_KEY_VAR")
        .with_file_fields(&key_file, &[&["auth", "api_key"], &["steam", "api_key"]]);

    let web_fetch = FakeSteam::with_pages(vec![app_page(&[1, 2, 3]), app_page(&[4, 5, 6])]);
    let web = SteamWebIngestor::with_fetch(Box::new(web_fetch), &paths, keys).with_options(
        AppListOptions {
            include_dlc: true,
            page_size: 3,
        },
    );
    let web_report = web.ingest("app_list").unwrap();
    assert_eq!(web_report.fetched, 6);

    let store_fetch = FakeSteam::default();
    let store = SteamStoreIngestor::with_fetch(Box::new(store_fetch.clone()), &paths)
        .with_request_delay(Duration::ZERO)
        .with_options(StoreDetailsOptions {
            limit: Some(4),
            ..StoreDetailsOptions::default()
        });

    let first = store.ingest("app_details_from_app_list").unwrap();
    assert_eq!(store_fetch.detail_requests(), vec![1, 2, 3, 4]);
    assert_eq!(first.fetched, 4);
    assert_eq!(persisted_detail_ids(&paths), vec![1, 2, 3, 4]);

    let second = store.ingest("app_details_from_app_list").unwrap();
    assert_eq!(store_fetch.detail_requests(), vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(second.fetched, 1);
    assert_eq!(second.table_rows, 5);
    assert_eq!(persisted_detail_ids(&paths), vec![1, 2, 3, 4, 6]);

    // App 5 never succeeds, so it stays eligible on every run.
    let third = store.ingest("app_details_from_app_list").unwrap();
    assert_eq!(store_fetch.detail_requests(), vec![1, 2, 3, 4, 5, 6, 5]);
    assert_eq!(third.fetched, 0);
    assert_eq!(persisted_detail_ids(&paths), vec![1, 2, 3, 4, 6]);

    let table = TableStore::new(&paths.table_root)
        .load("steam_store", "app_details")
        .unwrap();
    assert!(table.has_column("release_date.date"));
    assert!(table.has_column("is_free"));
}

#[test]
fn explicit_catalog_path_overrides_default() {
    let temp = tempdir().unwrap();
    let paths = IngestPaths::from_data_dir(temp.path());
    let catalog = temp.path().join("subset.parquet");
    let subset = steam_ingest::Table::from_records(&[json!({"appid": "11"}), json!({"appid": " 12"})]);
    let written = TableStore::new(temp.path().join("elsewhere"))
        .save_table("custom", "subset", &subset)
        .unwrap();
    fs::rename(&written, &catalog).unwrap();

    let fetch = FakeSteam::default();
    let store = SteamStoreIngestor::with_fetch(Box::new(fetch.clone()), &paths)
        .with_request_delay(Duration::ZERO);
    let report = store
        .ingest_from_app_list(&StoreDetailsOptions {
            app_list_path: Some(catalog.clone()),
            limit: None,
            ..StoreDetailsOptions::default()
        })
        .unwrap();

    assert_eq!(fetch.detail_requests(), vec![11, 12]);
    assert_eq!(report.fetched, 2);
    let raw: Value = serde_json::from_slice(&fs::read(report.raw_path.unwrap()).unwrap()).unwrap();
    assert_eq!(raw["meta"]["source"], json!(catalog.display().to_string()));
}
