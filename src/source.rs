pub mod acrcloud;

use jiff::civil::Date;
use serde_json::Value;

use crate::error::UpstreamError;

/// Upstream service holding the daily monitoring reports.
pub trait ReportSource {
    /// Full day report for one stream of a project.
    fn query_day_report(
        &self,
        project_id: i64,
        stream_id: &str,
        date: Date,
    ) -> Result<Value, UpstreamError>;
}
