//! Crawler module for paginated listing crawls
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - HTML result table parsing
//! - The per-unit page loop
//! - Worker pool scheduling
//! - Overall crawl coordination

mod context;
mod coordinator;
mod fetcher;
mod parser;
mod processor;
mod scheduler;

pub use context::{pause, CrawlContext};
pub use coordinator::{pagination_policy, run_crawl, Coordinator};
pub use fetcher::{build_http_client, FetchError, HttpFetcher, PageFetcher};
pub use parser::{
    estimate_total_pages, has_more_pages, HtmlTableParser, PageParser, PaginationPolicy,
    ParseError, ParsedPage,
};
pub use processor::{UnitOutcome, UnitProcessor, UnitReport};
pub use scheduler::Scheduler;
