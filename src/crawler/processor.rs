//! Per-unit page loop
//!
//! A unit is walked page by page, strictly in order:
//! fetch → parse → dedup → persist → checkpoint → pause. Only the last three
//! steps touch shared state, each under its own lock and only for the length
//! of that step. Fetching and parsing run without any lock held.

use crate::crawler::context::{pause, CrawlContext};
use crate::crawler::{estimate_total_pages, ParsedPage};
use crate::domain::{UnitKey, WorkUnit};
use crate::state::{Checkpoint, UnitState};
use crate::storage::{RawRecord, Record};

/// How a unit's walk ended in this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    /// The source reported no further pages
    Completed,

    /// A page could not be fetched; the unit resumes at that page next run
    FetchFailed { page: u32, error: String },

    /// The page ceiling was reached before the source ran out of pages
    PageLimit { page: u32 },

    /// Cancellation was observed; `next_page` is where the unit resumes
    Stopped { next_page: u32 },

    /// Cancellation was observed before the unit started
    NotStarted,

    /// A record batch or checkpoint could not be written
    StorageFailed { error: String },

    /// The unit's task panicked
    Panicked { error: String },
}

impl UnitOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Ended on an error rather than by finishing or stopping
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::FetchFailed { .. }
                | Self::PageLimit { .. }
                | Self::StorageFailed { .. }
                | Self::Panicked { .. }
        )
    }
}

/// What one unit accomplished during this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub key: UnitKey,
    pub label: String,

    /// Pages processed and checkpointed in this run
    pub pages: u32,

    /// Records this unit persisted that no unit had stored before
    pub new_records: u64,

    /// Records rejected as malformed
    pub skipped_records: usize,

    pub outcome: UnitOutcome,
}

impl UnitReport {
    pub fn new(unit: &WorkUnit, outcome: UnitOutcome) -> Self {
        Self {
            key: unit.key.clone(),
            label: unit.label.clone(),
            pages: 0,
            new_records: 0,
            skipped_records: 0,
            outcome,
        }
    }
}

/// Walks a single work unit's pages
pub struct UnitProcessor<'a> {
    ctx: &'a CrawlContext,
    unit: &'a WorkUnit,
    state: UnitState,
    pages: u32,
    new_records: u64,
    skipped_records: usize,
}

impl<'a> UnitProcessor<'a> {
    pub fn new(ctx: &'a CrawlContext, unit: &'a WorkUnit) -> Self {
        Self {
            ctx,
            unit,
            state: UnitState::Fetching(unit.start_page),
            pages: 0,
            new_records: 0,
            skipped_records: 0,
        }
    }

    /// Processes pages from the unit's start page until it ends
    ///
    /// Never returns an error: every way the walk can end is an outcome in
    /// the report, and progress for every page reported as processed is
    /// already durable.
    pub async fn run(mut self) -> UnitReport {
        let outcome = self.walk().await;
        self.transition(UnitState::Done);

        match &outcome {
            UnitOutcome::Completed => tracing::info!(
                "✓ {}: {} new records over {} pages",
                self.unit.label,
                self.new_records,
                self.pages
            ),
            UnitOutcome::Stopped { next_page } => tracing::info!(
                "Stopped {} before page {} ({} new records)",
                self.unit.label,
                next_page,
                self.new_records
            ),
            UnitOutcome::FetchFailed { page, error } => tracing::warn!(
                "✗ {}: page {} failed, will resume there next run: {}",
                self.unit.label,
                page,
                error
            ),
            UnitOutcome::PageLimit { page } => tracing::warn!(
                "✗ {}: reached the page limit at page {}",
                self.unit.label,
                page
            ),
            UnitOutcome::StorageFailed { error } => {
                tracing::error!("✗ {}: storage failure: {}", self.unit.label, error)
            }
            UnitOutcome::NotStarted | UnitOutcome::Panicked { .. } => {}
        }

        UnitReport {
            key: self.unit.key.clone(),
            label: self.unit.label.clone(),
            pages: self.pages,
            new_records: self.new_records,
            skipped_records: self.skipped_records,
            outcome,
        }
    }

    async fn walk(&mut self) -> UnitOutcome {
        let ctx = self.ctx;
        let unit = self.unit;
        let max_pages = ctx.config.max_pages_per_unit;
        let mut total_pages: Option<u32> = None;
        let mut page = unit.start_page;

        if page > 1 {
            tracing::info!("Resuming {} from page {}", unit.label, page);
        }

        loop {
            if page > max_pages {
                return UnitOutcome::PageLimit { page };
            }

            self.transition(UnitState::Fetching(page));
            let content = match ctx.fetcher.fetch(unit, page).await {
                Ok(content) => content,
                Err(e) => {
                    return UnitOutcome::FetchFailed {
                        page,
                        error: e.to_string(),
                    }
                }
            };

            self.transition(UnitState::Parsing);
            let parsed = match ctx.parser.parse(&content) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!("Unparseable page {} of {}: {}", page, unit.key, e);
                    ParsedPage::empty()
                }
            };

            if total_pages.is_none() {
                total_pages = parsed
                    .total_count
                    .and_then(|total| estimate_total_pages(total, ctx.config.page_size));
                if let (Some(pages), Some(total)) = (total_pages, parsed.total_count) {
                    tracing::debug!("{}: {} records over ~{} pages", unit.key, total, pages);
                }
            }

            if parsed.skipped_rows > 0 {
                self.skipped_records += parsed.skipped_rows;
                tracing::warn!(
                    "Skipped {} short rows on {} page {}",
                    parsed.skipped_rows,
                    unit.key,
                    page
                );
            }

            if page == 1 && parsed.records.is_empty() {
                tracing::debug!("No data for {}", unit.label);
            }

            self.transition(UnitState::Deduping);
            let fresh = self.claim_records(parsed.records, page);

            self.transition(UnitState::Persisting);
            let written = match ctx.sink.append(&unit.key, &fresh) {
                Ok(written) => written as u64,
                Err(e) => {
                    return UnitOutcome::StorageFailed {
                        error: e.to_string(),
                    }
                }
            };

            self.transition(UnitState::Checkpointing);
            let checkpoint = Checkpoint {
                unit: unit.key.clone(),
                page,
                total_pages,
                completed: !parsed.has_more,
                new_records: written,
            };
            if let Err(e) = ctx.progress.checkpoint(&checkpoint) {
                return UnitOutcome::StorageFailed {
                    error: e.to_string(),
                };
            }

            self.pages += 1;
            self.new_records += written;
            tracing::debug!(
                "{} page {}/{}: {} new records",
                unit.key,
                page,
                total_pages.map_or_else(|| "?".to_string(), |t| t.to_string()),
                written
            );

            if !parsed.has_more {
                return UnitOutcome::Completed;
            }
            if page >= max_pages {
                return UnitOutcome::PageLimit { page: page + 1 };
            }
            if !pause(ctx.config.page_delay(), &ctx.cancel).await {
                return UnitOutcome::Stopped {
                    next_page: page + 1,
                };
            }

            page += 1;
        }
    }

    /// Validates raw records and claims their keys
    ///
    /// Returns only the records whose key this unit claimed first.
    fn claim_records(&mut self, raw: Vec<RawRecord>, page: u32) -> Vec<Record> {
        let mut fresh = Vec::with_capacity(raw.len());
        for raw in raw {
            match Record::from_raw(raw, &self.ctx.schema) {
                Ok(record) => {
                    if self.ctx.dedup.try_claim(&record.key) {
                        fresh.push(record);
                    }
                }
                Err(e) => {
                    self.skipped_records += 1;
                    tracing::warn!(
                        "Skipping record on {} page {}: {}",
                        self.unit.key,
                        page,
                        e
                    );
                }
            }
        }
        fresh
    }

    fn transition(&mut self, next: UnitState) {
        debug_assert!(
            !self.state.is_terminal(),
            "{} left the done state",
            self.unit.key
        );
        tracing::trace!(
            locked = next.holds_lock(),
            "{}: {} -> {}",
            self.unit.key,
            self.state,
            next
        );
        self.state = next;
    }
}
