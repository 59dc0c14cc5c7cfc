//! Collaborators shared by every worker of a run

use crate::config::CrawlerConfig;
use crate::crawler::{PageFetcher, PageParser};
use crate::state::DedupIndex;
use crate::storage::{ProgressStore, RecordSchema, RecordSink};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Everything a unit processor needs, owned once per run
///
/// The three shared stores guard themselves: the dedup index, the record
/// sink and the progress document each sit behind their own lock, so a
/// slow disk write on one never blocks claims on another.
pub struct CrawlContext {
    pub fetcher: Arc<dyn PageFetcher>,
    pub parser: Arc<dyn PageParser>,
    pub schema: RecordSchema,
    pub dedup: Arc<DedupIndex>,
    pub sink: Arc<dyn RecordSink>,
    pub progress: Arc<ProgressStore>,
    pub config: CrawlerConfig,
    pub cancel: CancellationToken,
}

/// Sleeps for `duration` unless cancellation comes first
///
/// Returns false if the run was cancelled before or during the pause.
pub async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    if duration.is_zero() {
        return true;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = cancel.cancelled() => false,
    }
}
