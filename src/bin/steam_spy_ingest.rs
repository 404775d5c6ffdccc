use std::process::ExitCode;

fn main() -> ExitCode {
    ExitCode::from(steam_ingest::apps::run_steam_spy_ingest(std::env::args().skip(1)))
}
