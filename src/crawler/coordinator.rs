//! Crawl coordinator - main orchestration logic
//!
//! The coordinator wires the run together:
//! - Loading the domain description and saved progress
//! - Opening the record sink and seeding the dedup index from it
//! - Enumerating pending units
//! - Handing them to the scheduler and summarizing the outcome

use crate::config::{hash_file, Config, CrawlerConfig};
use crate::crawler::context::CrawlContext;
use crate::crawler::{
    HtmlTableParser, HttpFetcher, PageFetcher, PageParser, PaginationPolicy, Scheduler,
};
use crate::domain::{load_domain, DomainDescription, Enumeration, WorkEnumerator};
use crate::output::RunSummary;
use crate::state::{DedupIndex, ProgressState};
use crate::storage::{ProgressStore, RecordSchema, RecordSink, SqliteRecordSink};
use crate::CrawlError;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Main crawl coordinator
///
/// Owns every collaborator of a run. Everything that can fail fatally
/// (unreadable domain description, unusable record sink) fails in `new`,
/// before any unit is dispatched.
pub struct Coordinator {
    domain: DomainDescription,
    ctx: Arc<CrawlContext>,
}

impl Coordinator {
    /// Creates a coordinator that fetches over HTTP and parses HTML tables
    ///
    /// # Arguments
    ///
    /// * `config` - Validated crawl configuration
    /// * `fresh` - Ignore saved progress and walk every unit from page 1
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(CrawlError)` - Domain, progress or record sink could not be opened
    pub fn new(config: Config, fresh: bool) -> Result<Self, CrawlError> {
        let fetcher = HttpFetcher::new(&config.source)?;
        let parser = HtmlTableParser::new(&config.parser, pagination_policy(&config.crawler))?;
        Self::with_collaborators(config, fresh, Arc::new(fetcher), Arc::new(parser))
    }

    /// Creates a coordinator around a given fetcher and parser
    pub fn with_collaborators(
        config: Config,
        fresh: bool,
        fetcher: Arc<dyn PageFetcher>,
        parser: Arc<dyn PageParser>,
    ) -> Result<Self, CrawlError> {
        let domain_path = Path::new(&config.output.domain_path);
        let domain = load_domain(domain_path)?;
        let domain_hash = hash_file(domain_path)?;
        tracing::info!(
            "Loaded domain with {} units ({} x {})",
            domain.unit_count(),
            domain.dimensions[0],
            domain.dimensions[1]
        );

        let progress_path = Path::new(&config.output.progress_path);
        let progress = if fresh {
            tracing::info!("Fresh run requested, ignoring saved progress");
            ProgressStore::with_state(progress_path, ProgressState::new())
        } else {
            ProgressStore::open(progress_path)
        };
        progress.set_domain_hash(&domain_hash)?;

        let schema = RecordSchema::from_parser_config(&config.parser);
        let sink = SqliteRecordSink::open(Path::new(&config.output.records_path), &schema)?;

        let dedup = DedupIndex::new();
        dedup.seed(sink.existing_keys()?);
        if dedup.is_empty() {
            tracing::info!("No stored records yet, every record will be new");
        } else {
            tracing::info!("Loaded {} existing record keys", dedup.len());
        }

        let ctx = CrawlContext {
            fetcher,
            parser,
            schema,
            dedup: Arc::new(dedup),
            sink: Arc::new(sink),
            progress: Arc::new(progress),
            config: config.crawler,
            cancel: CancellationToken::new(),
        };

        Ok(Self {
            domain,
            ctx: Arc::new(ctx),
        })
    }

    /// Token that stops the run gracefully when cancelled
    ///
    /// Active units finish their current page, checkpoint it and stop; queued
    /// units are not started.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.ctx.cancel.clone()
    }

    /// Pending units with their resume pages, without fetching anything
    pub fn plan(&self) -> Result<Enumeration, CrawlError> {
        let state = self.ctx.progress.snapshot()?;
        Ok(WorkEnumerator::new(&self.domain).enumerate(&state))
    }

    /// Runs the crawl until every pending unit has ended
    ///
    /// Per-unit failures never abort the run; they are counted in the
    /// summary and the affected units resume on the next run.
    pub async fn run(&self) -> Result<RunSummary, CrawlError> {
        let started = Instant::now();
        let plan = self.plan()?;

        tracing::info!(
            "{} of {} units pending ({} already completed)",
            plan.pending(),
            plan.total,
            plan.completed
        );

        let mut summary = RunSummary::new(plan.total, plan.completed);
        if plan.is_empty() {
            tracing::info!("All units already completed, nothing to do");
        } else {
            let scheduler = Scheduler::new(Arc::clone(&self.ctx));
            tracing::info!(
                "Dispatching {} units across {} workers",
                plan.pending(),
                scheduler.workers()
            );
            let reports = scheduler.run(plan.units).await;
            summary.record_units(&reports);
        }

        if let Err(e) = self.ctx.progress.flush() {
            tracing::error!("Failed to write final progress: {}", e);
            summary.storage_errors.push(e.to_string());
        }

        summary.stopped_early = self.ctx.cancel.is_cancelled();
        summary.records_in_sink = self.ctx.sink.count().ok();
        summary.elapsed = started.elapsed();
        Ok(summary)
    }
}

/// Next-page policy implied by the crawler settings
pub fn pagination_policy(config: &CrawlerConfig) -> PaginationPolicy {
    PaginationPolicy {
        page_size: config.page_size,
        strict: config.strict_pagination,
    }
}

/// Runs a complete crawl with the default HTTP fetcher and HTML parser
///
/// # Arguments
///
/// * `config` - Validated crawl configuration
/// * `fresh` - Ignore saved progress
///
/// # Returns
///
/// * `Ok(RunSummary)` - The run finished (possibly with per-unit failures)
/// * `Err(CrawlError)` - The run could not start
pub async fn run_crawl(config: Config, fresh: bool) -> Result<RunSummary, CrawlError> {
    let coordinator = Coordinator::new(config, fresh)?;
    coordinator.run().await
}
