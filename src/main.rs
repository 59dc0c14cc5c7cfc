//! Pagewalk main entry point
//!
//! This is the command-line interface for the Pagewalk resumable crawler.

use anyhow::{bail, Context};
use clap::Parser;
use pagewalk::config::{load_config_with_hash, Config};
use pagewalk::crawler::Coordinator;
use pagewalk::domain::{load_domain, WorkEnumerator};
use pagewalk::output::{load_statistics, print_statistics, print_summary};
use pagewalk::state::ProgressState;
use pagewalk::storage::ProgressStore;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Pagewalk: a resumable paginated crawler
///
/// Pagewalk walks every combination of a two-level query domain page by
/// page, stores only records it has not seen before, and checkpoints after
/// every page so an interrupted run resumes where it stopped.
#[derive(Parser, Debug)]
#[command(name = "pagewalk")]
#[command(version)]
#[command(about = "A resumable paginated crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Ignore saved progress and walk every unit from page 1
    #[arg(long)]
    fresh: bool,

    /// Validate config and list pending units without fetching anything
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the progress document and record sink and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Override the configured number of workers
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
    workers: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }

    if cli.dry_run {
        handle_dry_run(&config, cli.fresh)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(config, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("pagewalk=info,warn"),
            1 => EnvFilter::new("pagewalk=debug,info"),
            2 => EnvFilter::new("pagewalk=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows which units a run would dispatch
///
/// Reads the domain and progress only; nothing is fetched or written.
fn handle_dry_run(config: &Config, fresh: bool) -> anyhow::Result<()> {
    println!("=== Pagewalk Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Page delay: {}ms", config.crawler.page_delay_ms);
    println!("  Unit delay: {}ms", config.crawler.unit_delay_ms);
    println!("  Max pages per unit: {}", config.crawler.max_pages_per_unit);
    println!("  Page size: {}", config.crawler.page_size);
    println!("  Strict pagination: {}", config.crawler.strict_pagination);

    println!("\nSource:");
    println!("  Base URL: {}", config.source.base_url);
    println!("  Page parameter: {}", config.source.page_param);
    println!("  Key field: {}", config.parser.key_field);

    println!("\nOutput:");
    println!("  Domain: {}", config.output.domain_path);
    println!("  Progress: {}", config.output.progress_path);
    println!("  Records: {}", config.output.records_path);

    let domain = load_domain(Path::new(&config.output.domain_path))?;
    let progress = if fresh {
        ProgressState::new()
    } else {
        ProgressStore::load(Path::new(&config.output.progress_path))
    };
    let plan = WorkEnumerator::new(&domain).enumerate(&progress);

    println!(
        "\nPending Units ({} of {}, {} completed):",
        plan.pending(),
        plan.total,
        plan.completed
    );
    for unit in &plan.units {
        if unit.start_page > 1 {
            println!("  - {} [{}] from page {}", unit.label, unit.key, unit.start_page);
        } else {
            println!("  - {} [{}]", unit.label, unit.key);
        }
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would dispatch {} units", plan.pending());

    Ok(())
}

/// Handles the --stats mode: shows statistics from the stored state
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Progress: {}", config.output.progress_path);
    println!("Records: {}\n", config.output.records_path);

    let stats = load_statistics(
        Path::new(&config.output.progress_path),
        Path::new(&config.output.records_path),
    )?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring previous progress)");
    } else {
        tracing::info!("Starting crawl (will resume from saved progress)");
    }

    let coordinator = Coordinator::new(config, fresh).context("Failed to start crawl")?;

    let cancel = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing current pages before stopping");
            cancel.cancel();
        }
    });

    let summary = coordinator.run().await?;
    print_summary(&summary);

    if summary.has_storage_errors() {
        bail!(
            "{} storage errors during the run; stored progress may lag behind the records",
            summary.storage_errors.len()
        );
    }

    tracing::info!("Crawl finished");
    Ok(())
}
