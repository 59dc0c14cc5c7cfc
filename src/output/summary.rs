//! End-of-run summary

use crate::crawler::{UnitOutcome, UnitReport};
use std::time::Duration;

/// What a single run accomplished
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Units the domain describes
    pub units_total: usize,

    /// Units completed by earlier runs and skipped
    pub previously_completed: usize,

    /// Units handed to the worker pool
    pub dispatched: usize,

    /// Units that reached their last page in this run
    pub completed: usize,

    /// Units ending on a fetch failure, the page limit, a storage failure or a panic
    pub failed: usize,

    /// Units left untouched or stopped early by cancellation
    pub interrupted: usize,

    /// Pages processed and checkpointed
    pub pages: u64,

    /// Records persisted for the first time
    pub new_records: u64,

    /// Records rejected as malformed
    pub skipped_records: u64,

    /// Records in the sink after the run, if it could be counted
    pub records_in_sink: Option<u64>,

    pub elapsed: Duration,

    /// Storage failures; any entry makes the run exit non-zero
    pub storage_errors: Vec<String>,

    /// Cancellation was requested during the run
    pub stopped_early: bool,
}

impl RunSummary {
    pub fn new(units_total: usize, previously_completed: usize) -> Self {
        Self {
            units_total,
            previously_completed,
            ..Self::default()
        }
    }

    /// Folds the per-unit reports into the totals
    pub fn record_units(&mut self, reports: &[UnitReport]) {
        for report in reports {
            self.dispatched += 1;
            self.pages += u64::from(report.pages);
            self.new_records += report.new_records;
            self.skipped_records += report.skipped_records as u64;

            match &report.outcome {
                UnitOutcome::Completed => self.completed += 1,
                UnitOutcome::Stopped { .. } | UnitOutcome::NotStarted => self.interrupted += 1,
                UnitOutcome::StorageFailed { error } => {
                    self.failed += 1;
                    self.storage_errors.push(format!("{}: {}", report.key, error));
                }
                UnitOutcome::FetchFailed { .. }
                | UnitOutcome::PageLimit { .. }
                | UnitOutcome::Panicked { .. } => self.failed += 1,
            }
        }
    }

    /// Units not yet completed after this run
    pub fn pending(&self) -> usize {
        self.units_total
            .saturating_sub(self.previously_completed + self.completed)
    }

    pub fn has_storage_errors(&self) -> bool {
        !self.storage_errors.is_empty()
    }
}

/// Prints the summary to stdout
pub fn print_summary(summary: &RunSummary) {
    println!("=== Run Summary ===\n");

    println!("Units:");
    println!("  In domain: {}", summary.units_total);
    println!("  Previously completed: {}", summary.previously_completed);
    println!("  Dispatched: {}", summary.dispatched);
    println!("  Completed this run: {}", summary.completed);
    println!("  Failed: {}", summary.failed);
    if summary.interrupted > 0 {
        println!("  Interrupted: {}", summary.interrupted);
    }
    println!("  Still pending: {}", summary.pending());
    println!();

    println!("Records:");
    println!("  Pages processed: {}", summary.pages);
    println!("  New records: {}", summary.new_records);
    if summary.skipped_records > 0 {
        println!("  Malformed, skipped: {}", summary.skipped_records);
    }
    if let Some(total) = summary.records_in_sink {
        println!("  Total stored: {}", total);
    }
    println!();

    println!("Elapsed: {:.1}s", summary.elapsed.as_secs_f64());
    if summary.stopped_early {
        println!("Stopped early; rerun to resume.");
    }

    if summary.has_storage_errors() {
        println!();
        println!("!!! {} STORAGE ERRORS !!!", summary.storage_errors.len());
        for error in &summary.storage_errors {
            println!("  - {}", error);
        }
    }
}
