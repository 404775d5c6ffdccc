/// Constants shared by the HTTP fetch client.
pub mod http {
    /// Timeout in seconds for each request phase: connect, send, response head.
    pub const REQUEST_TIMEOUT_SECS: u64 = 20;
    /// Timeout in seconds for reading one response body.
    pub const RESPONSE_BODY_TIMEOUT_SECS: u64 = 600;
    /// Upper bound on a single response body.
    pub const MAX_BODY_BYTES: u64 = 256 * 1024 * 1024;
    /// Attempts made before a failure is surfaced to the caller.
    pub const RETRY_MAX_ATTEMPTS: u32 = 5;
    /// Backoff multiplier in seconds.
    pub const RETRY_MULTIPLIER_SECS: f64 = 1.0;
    /// Shortest wait between attempts, in seconds.
    pub const RETRY_MIN_WAIT_SECS: f64 = 2.0;
    /// Longest wait between attempts, in seconds.
    pub const RETRY_MAX_WAIT_SECS: f64 = 10.0;
}

/// Constants used by the raw and tabular stores.
pub mod store {
    /// Default data directory holding the raw and table roots.
    pub const DEFAULT_DATA_DIR: &str = "data";
    /// Raw store directory under the data directory.
    pub const RAW_DIR: &str = "raw";
    /// Table store directory under the data directory.
    pub const TABLE_DIR: &str = "bronze";
    /// Raw payload file extension.
    pub const RAW_EXTENSION: &str = "json";
    /// Table file extension.
    pub const TABLE_EXTENSION: &str = "parquet";
    /// Separator between nested key segments in flattened column names.
    pub const COLUMN_SEPARATOR: &str = ".";
}

/// SteamSpy aggregate statistics source.
pub mod steam_spy {
    /// Source name and output namespace.
    pub const SOURCE_NAME: &str = "steam_spy";
    /// API base URL. The API is addressed purely by query parameters.
    pub const BASE_URL: &str = "https://steamspy.com/api.php";
    /// Identifier for the full `request=all` dataset.
    pub const IDENTIFIER_ALL: &str = "all";
}

/// Steam Web API store listing source.
pub mod steam_web {
    /// Source name and output namespace.
    pub const SOURCE_NAME: &str = "steam_web";
    /// API base URL.
    pub const BASE_URL: &str = "https://api.steampowered.com";
    /// Paginated app list endpoint.
    pub const APP_LIST_ENDPOINT: &str = "/IStoreService/GetAppList/v1/";
    /// Identifier for the full app list.
    pub const IDENTIFIER_APP_LIST: &str = "app_list";
    /// Default number of apps requested per page.
    pub const DEFAULT_PAGE_SIZE: usize = 50_000;
    /// Environment variable holding the API key.
    pub const API_KEY_ENV: &str = "STEAM_API_KEY";
    /// Developer-local config file, checked before the shared one.
    pub const LOCAL_CONFIG_PATH: &str = "config/sources/steam_web_api.local.yaml";
    /// Shared config file.
    pub const SHARED_CONFIG_PATH: &str = "config/sources/steam_web_api.yaml";
    /// Key paths tried inside each config file, in order.
    pub const API_KEY_FIELDS: [&[&str]; 3] = [&["auth", "api_key"], &["steam", "api_key"], &["api_key"]];
}

/// Steam Store per-app detail source.
pub mod steam_store {
    /// Source name and output namespace.
    pub const SOURCE_NAME: &str = "steam_store";
    /// API base URL.
    pub const BASE_URL: &str = "https://store.steampowered.com/api";
    /// Per-app detail endpoint.
    pub const APP_DETAILS_ENDPOINT: &str = "/appdetails";
    /// CLI identifier for the incremental detail run.
    pub const IDENTIFIER_FROM_APP_LIST: &str = "app_details_from_app_list";
    /// Output file stem for detail payloads and tables.
    pub const APP_DETAILS_STEM: &str = "app_details";
    /// Default number of apps fetched per run.
    pub const DEFAULT_LIMIT: usize = 200;
    /// Default courtesy delay between requests, in seconds.
    pub const DEFAULT_REQUEST_DELAY_SECS: f64 = 0.3;
    /// [`DEFAULT_REQUEST_DELAY_SECS`] as the command-line default.
    pub const DEFAULT_REQUEST_DELAY_ARG: &str = "0.3";
    /// Default store country code.
    pub const DEFAULT_COUNTRY_CODE: &str = "us";
    /// Default store language.
    pub const DEFAULT_LANGUAGE: &str = "english";
}

/// Column names shared across sources.
pub mod columns {
    /// Key column of every Steam table.
    pub const APP_ID: &str = "appid";
}

/// Prefix used by CLI banners.
pub const CLI_PREFIX: &str = "[steam-ingest]";
