//! Data integrity check

use super::today;
use crate::display::{format_integrity_report, format_repair_report};
use crate::error::KesefResult;
use crate::migration::{check_integrity, repair};
use crate::storage::Storage;

/// Scan the data, optionally repairing what can be fixed
///
/// Returns whether the data is clean afterwards.
pub fn handle_check_command(storage: &Storage, fix: bool) -> KesefResult<bool> {
    if fix {
        let report = repair(storage, today())?;
        print!("{}", format_repair_report(&report));
        Ok(report.remaining.is_clean())
    } else {
        let report = check_integrity(storage, today())?;
        print!("{}", format_integrity_report(&report));
        if !report.is_clean() {
            println!("\nלתיקון: kesef check --repair");
        }
        Ok(report.is_clean())
    }
}
