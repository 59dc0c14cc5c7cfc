//! Statistics over the stored crawl state
//!
//! This module reads the progress document and the record sink without
//! running a crawl, for the `--stats` mode.

use crate::storage::{ProgressStore, SqliteRecordSink, StorageResult};
use chrono::{DateTime, Utc};
use std::path::Path;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Units with a progress entry
    pub units_tracked: usize,

    pub units_completed: usize,

    /// Units with at least one page done but not completed
    pub units_in_progress: usize,

    /// Sum of checkpointed pages over all units
    pub pages_processed: u64,

    /// New-record counter accumulated in the progress document
    pub new_records_found: u64,

    /// Records currently stored in the sink
    pub records_stored: u64,

    pub start_time: DateTime<Utc>,

    pub last_update: DateTime<Utc>,
}

/// Loads statistics from the progress document and the record sink
///
/// # Arguments
///
/// * `progress_path` - JSON progress document
/// * `records_path` - SQLite record sink
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - The record sink could not be queried
pub fn load_statistics(progress_path: &Path, records_path: &Path) -> StorageResult<CrawlStatistics> {
    let state = ProgressStore::load(progress_path);
    let records_stored = SqliteRecordSink::count_at(records_path)?;

    Ok(CrawlStatistics {
        units_tracked: state.units.len(),
        units_completed: state.completed_count(),
        units_in_progress: state.in_progress_count(),
        pages_processed: state.pages_processed(),
        new_records_found: state.new_records_found,
        records_stored,
        start_time: state.start_time,
        last_update: state.last_update,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Units:");
    println!("  Tracked: {}", stats.units_tracked);
    println!("  Completed: {}", stats.units_completed);
    println!("  In progress: {}", stats.units_in_progress);
    println!();

    println!("Records:");
    println!("  Pages processed: {}", stats.pages_processed);
    println!("  New records found: {}", stats.new_records_found);
    println!("  Stored: {}", stats.records_stored);
    println!();

    let completion = if stats.units_tracked > 0 {
        (stats.units_completed as f64 / stats.units_tracked as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "Completion: {:.1}% ({} / {} tracked units)",
        completion, stats.units_completed, stats.units_tracked
    );
    println!("Started: {}", stats.start_time.to_rfc3339());
    println!("Last update: {}", stats.last_update.to_rfc3339());
}
