use std::error::Error;

use acrloader::{config::Settings, interval::DateWindow, job::load_missing_reports};
use jiff::{civil::date, Zoned};
use log::info;

/// Load every report since the start of the archive.  Run this once when
/// setting up a new backend, the nightly `acrloader` job keeps it current.
fn main() -> Result<(), Box<dyn Error>> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let settings = Settings::load()?;
    let start = date(2023, 1, 1);
    let window = DateWindow::since(start, Zoned::now().date());

    let summary = load_missing_reports(&settings, &window)?;
    info!(
        "seeded {} report(s) since {}, {} upstream call(s)",
        summary.written(),
        start,
        summary.upstream_calls
    );
    Ok(())
}
