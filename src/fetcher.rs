use std::collections::hash_map::Entry;
use std::collections::HashMap;

use jiff::civil::Date;
use log::{debug, info};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::source::ReportSource;

/// Identifies one upstream query.  Independent of where the report goes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchKey {
    pub project_id: i64,
    pub stream_id: String,
    pub date: Date,
}

/// Reports fetched during one run.  Never evicted, dropped with the run.
pub type FetchCache = HashMap<FetchKey, Value>;

/// Fetches day reports, asking the upstream at most once per key.
pub struct ReportFetcher<'a, S: ReportSource + ?Sized> {
    source: &'a S,
    cache: FetchCache,
    upstream_calls: usize,
}

impl<'a, S: ReportSource + ?Sized> ReportFetcher<'a, S> {
    pub fn new(source: &'a S) -> ReportFetcher<'a, S> {
        ReportFetcher {
            source,
            cache: FetchCache::new(),
            upstream_calls: 0,
        }
    }

    /// Report for `date`, from the cache if it was fetched before in this run.
    /// Upstream failures are not retried.
    pub fn fetch(&mut self, project_id: i64, stream_id: &str, date: Date) -> Result<&Value> {
        let key = FetchKey {
            project_id,
            stream_id: stream_id.to_string(),
            date,
        };
        match self.cache.entry(key) {
            Entry::Occupied(entry) => {
                debug!("report for {} already fetched", date);
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                info!("fetching report for {} from ACRCloud", date);
                self.upstream_calls += 1;
                let report = self
                    .source
                    .query_day_report(project_id, stream_id, date)
                    .map_err(|source| Error::Upstream { date, source })?;
                Ok(entry.insert(report))
            }
        }
    }

    /// Number of queries sent upstream so far.
    pub fn upstream_calls(&self) -> usize {
        self.upstream_calls
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
