use std::error::Error;

use acrloader::{config::Settings, interval::DateWindow, job::load_missing_reports};
use jiff::Zoned;
use log::info;

/// Number of days checked on every run
const LOOKBACK_DAYS: i64 = 7;

/// Run this job every night.  Fills the gaps of the last week.
fn main() -> Result<(), Box<dyn Error>> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let settings = Settings::load()?;
    let today = Zoned::now().date();
    let window = DateWindow::lookback(today, LOOKBACK_DAYS);

    let summary = load_missing_reports(&settings, &window)?;
    for backend in &summary.backends {
        info!(
            "{}: {} missing, {} written",
            backend.backend,
            backend.missing.len(),
            backend.written
        );
    }
    Ok(())
}
