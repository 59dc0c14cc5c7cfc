//! Worker pool for work units
//!
//! This module handles:
//! - Bounding how many units run at once with a semaphore
//! - Pacing each worker slot between units
//! - Skipping units once cancellation is requested
//! - Collecting one report per unit, including units whose task panicked

use crate::crawler::context::{pause, CrawlContext};
use crate::crawler::{UnitOutcome, UnitProcessor, UnitReport};
use crate::domain::WorkUnit;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Dispatches units onto a bounded set of concurrent workers
///
/// Each unit is one task. A task holds a semaphore permit for the whole unit
/// plus the inter-unit pause, so at most `workers` units are in flight and
/// every slot rests between units.
pub struct Scheduler {
    ctx: Arc<CrawlContext>,
    semaphore: Arc<Semaphore>,
}

impl Scheduler {
    pub fn new(ctx: Arc<CrawlContext>) -> Self {
        let workers = ctx.config.workers.max(1) as usize;
        Self {
            ctx,
            semaphore: Arc::new(Semaphore::new(workers)),
        }
    }

    /// Number of units allowed to run at once
    pub fn workers(&self) -> usize {
        self.ctx.config.workers.max(1) as usize
    }

    /// Runs every unit and waits for all of them
    ///
    /// Reports come back in completion order. Units still queued when
    /// cancellation arrives are reported as `NotStarted`.
    pub async fn run(&self, units: Vec<WorkUnit>) -> Vec<UnitReport> {
        let total = units.len();
        let mut tasks = JoinSet::new();

        for unit in units {
            let ctx = Arc::clone(&self.ctx);
            let semaphore = Arc::clone(&self.semaphore);
            tasks.spawn(run_unit(ctx, semaphore, unit));
        }

        let mut reports = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => {
                    reports.push(report);
                    if reports.len() % 10 == 0 || reports.len() == total {
                        tracing::info!("Progress: {}/{} units finished", reports.len(), total);
                    }
                }
                Err(e) => tracing::error!("Unit task failed to join: {}", e),
            }
        }

        reports
    }
}

async fn run_unit(ctx: Arc<CrawlContext>, semaphore: Arc<Semaphore>, unit: WorkUnit) -> UnitReport {
    let Ok(_permit) = semaphore.acquire_owned().await else {
        return UnitReport::new(&unit, UnitOutcome::NotStarted);
    };

    if ctx.cancel.is_cancelled() {
        return UnitReport::new(&unit, UnitOutcome::NotStarted);
    }

    tracing::debug!("Starting {} ({})", unit.label, unit.key);

    // A panic inside the unit must not take the permit or the run down with it.
    let worker_ctx = Arc::clone(&ctx);
    let worker_unit = unit.clone();
    let handle = tokio::spawn(async move {
        UnitProcessor::new(&worker_ctx, &worker_unit).run().await
    });

    let report = match handle.await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Unit {} panicked: {}", unit.key, e);
            UnitReport::new(
                &unit,
                UnitOutcome::Panicked {
                    error: e.to_string(),
                },
            )
        }
    };

    pause(ctx.config.unit_delay(), &ctx.cancel).await;
    report
}
