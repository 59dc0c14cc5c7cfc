//! Output module for run summaries and stored-state statistics

mod stats;
mod summary;

pub use stats::{load_statistics, print_statistics, CrawlStatistics};
pub use summary::{print_summary, RunSummary};
