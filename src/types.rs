/// Steam application identifier.
/// Examples: `10`, `570`, `1091500`
pub type AppId = i64;
/// Namespace of an ingestion source; also the directory under the raw and table roots.
/// Examples: `steam_spy`, `steam_web`, `steam_store`
pub type SourceName = String;
/// Dataset identifier within a source; also the output file stem.
/// Examples: `all`, `app_list`, `app_details`
pub type Identifier = String;
/// Flattened column name, nested object keys joined with `.`.
/// Examples: `appid`, `price_overview.currency`, `release_date.date`
pub type ColumnName = String;
