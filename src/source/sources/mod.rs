/// SteamSpy aggregate statistics (`all`).
pub mod steam_spy;
/// Incremental Steam Store app details driven by a catalog table.
pub mod steam_store;
/// Paginated Steam Web API app list.
pub mod steam_web;
