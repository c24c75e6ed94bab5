use jiff::civil::Date;
use log::{debug, info};

use crate::error::Result;
use crate::storage::StorageProbe;

/// Days in `dates` without a report in the backend behind `probe`, in the
/// order given.  Containers are created as the days are checked.
pub fn find_missing<'a, I>(dates: I, probe: &mut dyn StorageProbe) -> Result<Vec<Date>>
where
    I: IntoIterator<Item = &'a Date>,
{
    let mut missing = Vec::new();
    for &date in dates {
        probe.prepare(date)?;
        let locator = probe.locator(date);
        if probe.object_exists(&locator)? {
            debug!("{}: {} present", probe.name(), locator);
        } else {
            debug!("{}: {} missing", probe.name(), locator);
            missing.push(date);
        }
    }
    info!("{}: {} day(s) missing", probe.name(), missing.len());
    Ok(missing)
}
