use jiff::civil::Date;
use log::info;

use crate::error::Result;
use crate::fetcher::ReportFetcher;
use crate::source::ReportSource;
use crate::storage::{StorageProbe, JSON_CONTENT_TYPE};

/// The monitored stream whose reports are loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    pub project_id: i64,
    pub stream_id: String,
}

/// Fetch and store the report of every day in `missing`, oldest first.
///
/// Stops at the first failure, days written before it stay written.
/// Returns the number of reports written.
pub fn backfill<S: ReportSource + ?Sized>(
    missing: &[Date],
    stream: &Stream,
    fetcher: &mut ReportFetcher<S>,
    probe: &mut dyn StorageProbe,
) -> Result<usize> {
    let mut written = 0;
    for &date in missing {
        let report = fetcher.fetch(stream.project_id, &stream.stream_id, date)?;
        let body = serde_json::to_string(report)?;
        probe.prepare(date)?;
        let locator = probe.locator(date);
        probe.write_object(&locator, body.as_bytes(), JSON_CONTENT_TYPE)?;
        info!("{}: wrote {} ({} bytes)", probe.name(), locator, body.len());
        written += 1;
    }
    Ok(written)
}
