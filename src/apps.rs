//! Command-line runners behind the `src/bin` entry points.
//!
//! Each runner takes the arguments after the program name and returns the
//! process exit code: `0` on success, `1` on an unsupported identifier or an
//! ingest error, clap's own code (`2`) on a usage error.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, error::ErrorKind};
use tracing_subscriber::EnvFilter;

use crate::config::{AppListOptions, IngestPaths, StoreDetailsOptions};
use crate::constants::{CLI_PREFIX, steam_spy, steam_store, steam_web};
use crate::credentials::ApiKeyResolver;
use crate::source::{IngestReport, Ingestor, SteamSpyIngestor, SteamStoreIngestor, SteamWebIngestor};

#[derive(Debug, Parser)]
#[command(
    name = "steam_spy_ingest",
    disable_help_subcommand = true,
    about = "Fetch the SteamSpy aggregate statistics",
    long_about = "Download the SteamSpy `all` dataset, store it verbatim as JSON and as a flattened Parquet table."
)]
struct SteamSpyCli {
    #[arg(
        default_value = steam_spy::IDENTIFIER_ALL,
        help = "Dataset to ingest; only `all` is supported"
    )]
    identifier: String,
    #[arg(
        long = "data-dir",
        value_name = "DIR",
        default_value = crate::constants::store::DEFAULT_DATA_DIR,
        help = "Data root; raw JSON goes to DIR/raw, tables to DIR/bronze"
    )]
    data_dir: PathBuf,
}

#[derive(Debug, Parser)]
#[command(
    name = "steam_web_ingest",
    disable_help_subcommand = true,
    about = "Fetch the full Steam Web API app list",
    long_about = "Page through IStoreService/GetAppList and store the accumulated apps as JSON and Parquet.",
    after_help = "The API key is read from STEAM_API_KEY, then config/sources/steam_web_api.local.yaml, then config/sources/steam_web_api.yaml."
)]
struct SteamWebCli {
    #[arg(
        default_value = steam_web::IDENTIFIER_APP_LIST,
        help = "Dataset to ingest; only `app_list` is supported"
    )]
    identifier: String,
    #[arg(
        long = "page-size",
        default_value_t = steam_web::DEFAULT_PAGE_SIZE,
        value_parser = parse_page_size,
        help = "Results requested per page"
    )]
    page_size: usize,
    #[arg(long = "no-dlc", help = "Exclude DLC entries from the app list")]
    no_dlc: bool,
    #[arg(
        long = "data-dir",
        value_name = "DIR",
        default_value = crate::constants::store::DEFAULT_DATA_DIR,
        help = "Data root; raw JSON goes to DIR/raw, tables to DIR/bronze"
    )]
    data_dir: PathBuf,
}

#[derive(Debug, Parser)]
#[command(
    name = "steam_store_ingest",
    disable_help_subcommand = true,
    about = "Fetch Steam Store details for apps not yet enriched",
    long_about = "Read app ids from the app list table, fetch store details for the next batch of ids missing from the details table, and merge them in.",
    after_help = "Requires DIR/bronze/steam_web/app_list.parquet unless --app-list-parquet points elsewhere."
)]
struct SteamStoreCli {
    #[arg(
        default_value = steam_store::IDENTIFIER_FROM_APP_LIST,
        help = "Dataset to ingest; only `app_details_from_app_list` is supported"
    )]
    identifier: String,
    #[arg(
        long = "app-list-parquet",
        value_name = "PATH",
        help = "Catalog table to read app ids from (default: DIR/bronze/steam_web/app_list.parquet)"
    )]
    app_list_parquet: Option<PathBuf>,
    #[arg(
        long,
        default_value_t = steam_store::DEFAULT_LIMIT,
        help = "Maximum apps fetched this run, one request each"
    )]
    limit: usize,
    #[arg(
        long = "request-delay",
        value_name = "SECS",
        default_value = steam_store::DEFAULT_REQUEST_DELAY_ARG,
        value_parser = parse_request_delay,
        help = "Seconds to pause between requests; 0 disables the pause"
    )]
    request_delay: Duration,
    #[arg(
        long,
        default_value = steam_store::DEFAULT_COUNTRY_CODE,
        help = "Store country code, e.g. us or de"
    )]
    cc: String,
    #[arg(
        long,
        default_value = steam_store::DEFAULT_LANGUAGE,
        help = "Store language, e.g. english or german"
    )]
    language: String,
    #[arg(
        long = "data-dir",
        value_name = "DIR",
        default_value = crate::constants::store::DEFAULT_DATA_DIR,
        help = "Data root; raw JSON goes to DIR/raw, tables to DIR/bronze"
    )]
    data_dir: PathBuf,
}

/// Run the SteamSpy CLI.
pub fn run_steam_spy_ingest<I>(args_iter: I) -> u8
where
    I: IntoIterator<Item = String>,
{
    let cli = match parse_cli::<SteamSpyCli, _>(
        std::iter::once("steam_spy_ingest".to_string()).chain(args_iter),
    ) {
        Ok(Some(cli)) => cli,
        Ok(None) => return 0,
        Err(code) => return code,
    };
    init_tracing();

    let ingestor = SteamSpyIngestor::new(&IngestPaths::from_data_dir(&cli.data_dir));
    if let Err(code) = check_identifier(&ingestor, &cli.identifier) {
        return code;
    }
    println!("{CLI_PREFIX} starting SteamSpy ingest");
    println!("{CLI_PREFIX} identifier = {}", cli.identifier);

    run_ingest(&ingestor, &cli.identifier)
}

/// Run the Steam Web app list CLI.
pub fn run_steam_web_ingest<I>(args_iter: I) -> u8
where
    I: IntoIterator<Item = String>,
{
    let cli = match parse_cli::<SteamWebCli, _>(
        std::iter::once("steam_web_ingest".to_string()).chain(args_iter),
    ) {
        Ok(Some(cli)) => cli,
        Ok(None) => return 0,
        Err(code) => return code,
    };
    init_tracing();

    let options = AppListOptions {
        include_dlc: !cli.no_dlc,
        page_size: cli.page_size,
    };
    let ingestor = SteamWebIngestor::new(
        &IngestPaths::from_data_dir(&cli.data_dir),
        ApiKeyResolver::steam_web(),
    )
    .with_options(options);
    if let Err(code) = check_identifier(&ingestor, &cli.identifier) {
        return code;
    }
    println!("{CLI_PREFIX} starting Steam Web ingest");
    println!(
        "{CLI_PREFIX} identifier = {}, page_size = {}, include_dlc = {}",
        cli.identifier, options.page_size, options.include_dlc
    );

    run_ingest(&ingestor, &cli.identifier)
}

/// Run the incremental Steam Store details CLI.
pub fn run_steam_store_ingest<I>(args_iter: I) -> u8
where
    I: IntoIterator<Item = String>,
{
    let cli = match parse_cli::<SteamStoreCli, _>(
        std::iter::once("steam_store_ingest".to_string()).chain(args_iter),
    ) {
        Ok(Some(cli)) => cli,
        Ok(None) => return 0,
        Err(code) => return code,
    };
    init_tracing();

    let options = StoreDetailsOptions {
        app_list_path: cli.app_list_parquet,
        limit: Some(cli.limit),
        country_code: cli.cc,
        language: cli.language,
    };
    let ingestor = SteamStoreIngestor::new(&IngestPaths::from_data_dir(&cli.data_dir))
        .with_request_delay(cli.request_delay);
    let app_list_path = options
        .app_list_path
        .clone()
        .unwrap_or_else(|| ingestor.default_app_list_path());
    if let Err(code) = check_identifier(&ingestor, &cli.identifier) {
        return code;
    }

    println!("{CLI_PREFIX} starting Steam Store ingest");
    println!(
        "{CLI_PREFIX} app_list_parquet = {}, limit = {}, request_delay = {:.2}s, cc = {}, language = {}",
        app_list_path.display(),
        cli.limit,
        cli.request_delay.as_secs_f64(),
        options.country_code,
        options.language
    );

    let ingestor = ingestor.with_options(options);
    run_ingest(&ingestor, &cli.identifier)
}

/// Print the rejection and return exit code `1` for an identifier the
/// ingestor does not support. Runs before any banner or I/O.
fn check_identifier(ingestor: &dyn Ingestor, identifier: &str) -> Result<(), u8> {
    let supported = ingestor.identifiers();
    if supported.iter().any(|candidate| *candidate == identifier) {
        return Ok(());
    }
    println!(
        "{CLI_PREFIX} unsupported identifier '{identifier}' for {}; supported: {}",
        ingestor.source_name(),
        supported.join(", ")
    );
    Err(1)
}

/// Run one ingest pass for an already checked identifier and print the outcome.
fn run_ingest(ingestor: &dyn Ingestor, identifier: &str) -> u8 {
    match ingestor.ingest(identifier) {
        Ok(report) => {
            print_report(ingestor.source_name(), &report);
            0
        }
        Err(err) => {
            println!("{CLI_PREFIX} ERROR while ingesting {}:", ingestor.source_name());
            println!("  {}: {err}", err.kind());
            1
        }
    }
}

fn print_report(source_name: &str, report: &IngestReport) {
    if report.is_noop() {
        println!("{CLI_PREFIX} {source_name}: nothing to fetch, outputs unchanged");
        return;
    }
    println!("{CLI_PREFIX} {source_name} ingest finished");
    if let Some(path) = &report.raw_path {
        println!("{CLI_PREFIX} raw:     {}", path.display());
    }
    if let Some(path) = &report.table_path {
        println!("{CLI_PREFIX} parquet: {}", path.display());
    }
    println!(
        "{CLI_PREFIX} fetched {} records, table holds {} rows",
        report.fetched, report.table_rows
    );
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber may already be installed, e.g. when runners are called from tests.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Parse `args`; `Ok(None)` after printing help, `Err(code)` after a usage error.
fn parse_cli<T, I>(args: I) -> Result<Option<T>, u8>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = err.print();
                Ok(None)
            }
            _ => {
                let _ = err.print();
                Err(u8::try_from(err.exit_code()).unwrap_or(2))
            }
        },
    }
}

fn parse_page_size(raw: &str) -> Result<usize, String> {
    let parsed = raw
        .parse::<usize>()
        .map_err(|_| format!("Could not parse --page-size value '{raw}' as a positive integer"))?;
    if parsed == 0 {
        return Err("--page-size must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_request_delay(raw: &str) -> Result<Duration, String> {
    let parsed = raw
        .parse::<f64>()
        .map_err(|_| format!("Could not parse --request-delay value '{raw}' as seconds"))?;
    Duration::try_from_secs_f64(parsed).map_err(|_| {
        format!("--request-delay must be a non-negative number of seconds in range, got '{raw}'")
    })
}
