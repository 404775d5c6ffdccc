use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{http, steam_store, steam_web, store};

/// Output locations for the raw and tabular stores.
#[derive(Clone, Debug)]
pub struct IngestPaths {
    /// Root of raw JSON payloads (`{raw_root}/{source}/{identifier}.json`).
    pub raw_root: PathBuf,
    /// Root of flattened tables (`{table_root}/{source}/{identifier}.parquet`).
    pub table_root: PathBuf,
}

impl IngestPaths {
    /// Derive both roots from one data directory (`raw/` and `bronze/` beneath it).
    pub fn from_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            raw_root: data_dir.join(store::RAW_DIR),
            table_root: data_dir.join(store::TABLE_DIR),
        }
    }
}

impl Default for IngestPaths {
    fn default() -> Self {
        Self::from_data_dir(store::DEFAULT_DATA_DIR)
    }
}

/// Bounded exponential backoff applied by the fetch client.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Scale applied to `2^(attempt - 1)` before clamping.
    pub multiplier: Duration,
    /// Lower clamp for a single wait.
    pub min_wait: Duration,
    /// Upper clamp for a single wait.
    pub max_wait: Duration,
}

impl RetryPolicy {
    /// Policy that retries immediately, used where waiting is pointless.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            multiplier: Duration::ZERO,
            min_wait: Duration::ZERO,
            max_wait: Duration::ZERO,
        }
    }

    /// Wait applied after the failed attempt number `attempt` (1-based).
    pub fn wait_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31) as i32;
        let raw = self.multiplier.as_secs_f64() * 2f64.powi(exponent);
        let clamped = raw
            .max(self.min_wait.as_secs_f64())
            .min(self.max_wait.as_secs_f64());
        Duration::from_secs_f64(clamped)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: http::RETRY_MAX_ATTEMPTS,
            multiplier: Duration::from_secs_f64(http::RETRY_MULTIPLIER_SECS),
            min_wait: Duration::from_secs_f64(http::RETRY_MIN_WAIT_SECS),
            max_wait: Duration::from_secs_f64(http::RETRY_MAX_WAIT_SECS),
        }
    }
}

/// Options for the paginated Steam Web app list.
#[derive(Clone, Copy, Debug)]
pub struct AppListOptions {
    /// Include DLC entries in the listing.
    pub include_dlc: bool,
    /// Requested entries per page; a shorter page ends pagination.
    pub page_size: usize,
}

impl Default for AppListOptions {
    fn default() -> Self {
        Self {
            include_dlc: true,
            page_size: steam_web::DEFAULT_PAGE_SIZE,
        }
    }
}

/// Options for one incremental Steam Store detail run.
#[derive(Clone, Debug)]
pub struct StoreDetailsOptions {
    /// Catalog table providing the app ids to enrich.
    ///
    /// `None` uses the Steam Web app list under the configured table root.
    pub app_list_path: Option<PathBuf>,
    /// Maximum apps fetched this run; `None` fetches everything remaining.
    pub limit: Option<usize>,
    /// Store country code, e.g. `us` or `de`. Affects prices and availability.
    pub country_code: String,
    /// Store language, e.g. `english` or `german`.
    pub language: String,
}

impl Default for StoreDetailsOptions {
    fn default() -> Self {
        Self {
            app_list_path: None,
            limit: Some(steam_store::DEFAULT_LIMIT),
            country_code: steam_store::DEFAULT_COUNTRY_CODE.to_string(),
            language: steam_store::DEFAULT_LANGUAGE.to_string(),
        }
    }
}
