use std::fmt;

use jiff::civil::Date;
use log::{info, warn};

use crate::backfill::{backfill, Stream};
use crate::error::Result;
use crate::fetcher::ReportFetcher;
use crate::gap::find_missing;
use crate::interval::DateWindow;
use crate::source::ReportSource;
use crate::storage::StorageProbe;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Checking,
    Backfilling,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => f.write_str("idle"),
            RunState::Checking => f.write_str("checking"),
            RunState::Backfilling => f.write_str("backfilling"),
        }
    }
}

/// Outcome of a run for one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendReport {
    pub backend: String,
    pub missing: Vec<Date>,
    pub written: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub backends: Vec<BackendReport>,
    pub upstream_calls: usize,
}

impl RunSummary {
    pub fn missing(&self) -> usize {
        self.backends.iter().map(|b| b.missing.len()).sum()
    }

    pub fn written(&self) -> usize {
        self.backends.iter().map(|b| b.written).sum()
    }
}

/// Runs one check and backfill pass over every enabled backend.
///
/// All backends are checked first.  Then the gaps are filled backend by
/// backend with a single fetcher, so a day missing in several backends is
/// fetched from ACRCloud only once.  The first error ends the run.
pub struct RunCoordinator<'a> {
    stream: Stream,
    probes: Vec<&'a mut dyn StorageProbe>,
    state: RunState,
}

impl<'a> RunCoordinator<'a> {
    pub fn new(stream: Stream) -> RunCoordinator<'a> {
        RunCoordinator {
            stream,
            probes: Vec::new(),
            state: RunState::Idle,
        }
    }

    pub fn add_backend(&mut self, probe: &'a mut dyn StorageProbe) {
        self.probes.push(probe);
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        info!("{} -> {}", self.state, next);
        self.state = next;
    }

    pub fn run<S: ReportSource + ?Sized>(
        &mut self,
        window: &DateWindow,
        source: &S,
    ) -> Result<RunSummary> {
        if self.probes.is_empty() {
            warn!("no backend enabled, nothing to do");
            return Ok(RunSummary::default());
        }
        let result = self.check_and_backfill(window, source);
        self.transition(RunState::Idle);
        result
    }

    fn check_and_backfill<S: ReportSource + ?Sized>(
        &mut self,
        window: &DateWindow,
        source: &S,
    ) -> Result<RunSummary> {
        self.transition(RunState::Checking);
        let mut summary = RunSummary::default();
        for probe in self.probes.iter_mut() {
            info!("checking {} for days {}", probe.name(), window);
            let missing = find_missing(window, &mut **probe)?;
            summary.backends.push(BackendReport {
                backend: probe.name().to_string(),
                missing,
                written: 0,
            });
        }
        if summary.missing() == 0 {
            info!("all reports present, nothing to fetch");
            return Ok(summary);
        }

        self.transition(RunState::Backfilling);
        let mut fetcher = ReportFetcher::new(source);
        for (probe, report) in self.probes.iter_mut().zip(summary.backends.iter_mut()) {
            if report.missing.is_empty() {
                continue;
            }
            info!("loading {} day(s) into {}", report.missing.len(), report.backend);
            let written = backfill(&report.missing, &self.stream, &mut fetcher, &mut **probe);
            summary.upstream_calls = fetcher.upstream_calls();
            report.written = written?;
        }
        info!(
            "wrote {} report(s) with {} upstream call(s)",
            summary.written(),
            summary.upstream_calls
        );
        Ok(summary)
    }
}
