use std::fmt;

use jiff::civil::{Date, DateTime};
use jiff::ToSpan;

/// Naming conventions used to address a day's report.
pub trait DayNames {
    /// File name of the daily report, e.g. `2023-01-01.json`
    fn file_name(&self) -> String;
    /// Year folder, e.g. `2023`
    fn year_dir(&self) -> String;
    /// Month folder without zero padding, e.g. `1` for January.
    /// Existing archives use this layout, keep it that way.
    fn month_dir(&self) -> String;
    /// Date as the upstream API wants it, e.g. `20230101`
    fn query_date(&self) -> String;
}

impl DayNames for Date {
    fn file_name(&self) -> String {
        self.strftime("%Y-%m-%d.json").to_string()
    }

    fn year_dir(&self) -> String {
        self.year().to_string()
    }

    fn month_dir(&self) -> String {
        self.month().to_string()
    }

    fn query_date(&self) -> String {
        self.strftime("%Y%m%d").to_string()
    }
}

/// A contiguous run of days, start inclusive, end exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateWindow {
    days: Vec<Date>,
}

impl DateWindow {
    /// All days `d` with `start <= d < end`.  Empty if `end <= start`.
    pub fn new(start: Date, end: Date) -> DateWindow {
        if end <= start {
            return DateWindow { days: Vec::new() };
        }
        let days = start.series(1.day()).take_while(|d| *d < end).collect();
        DateWindow { days }
    }

    /// Window spanning the whole days between two instants.  The number of
    /// days is the floor of `end - start`, counted from the date of `start`.
    pub fn between(start: DateTime, end: DateTime) -> DateWindow {
        let count = match start.until(end) {
            Ok(span) => span.get_days().max(0),
            Err(_) => 0,
        };
        let days = start.date().series(1.day()).take(count as usize).collect();
        DateWindow { days }
    }

    /// The `days` days before `today`, not including `today`.
    pub fn lookback(today: Date, days: i64) -> DateWindow {
        let start = today.checked_sub(days.days()).unwrap_or(Date::MIN);
        DateWindow::new(start, today)
    }

    /// Every day from `start` up to, not including, `today`.
    pub fn since(start: Date, today: Date) -> DateWindow {
        DateWindow::new(start, today)
    }

    pub fn days(&self) -> &[Date] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

impl<'a> IntoIterator for &'a DateWindow {
    type Item = &'a Date;
    type IntoIter = std::slice::Iter<'a, Date>;

    fn into_iter(self) -> Self::IntoIter {
        self.days.iter()
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.days.first(), self.days.last()) {
            (Some(first), Some(last)) => write!(f, "[{}, {}]", first, last),
            _ => f.write_str("[]"),
        }
    }
}
