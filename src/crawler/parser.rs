//! Listing page parser
//!
//! This module turns the content of one result page into:
//! - Raw records, one per result row
//! - An optional total record count for the unit
//! - Whether another page follows

use crate::config::{ColumnConfig, ColumnKind, ParserConfig};
use crate::storage::RawRecord;
use crate::ConfigError;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

/// The page as a whole could not be interpreted
///
/// Treated by the unit processor as a page with no records and no next page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty document")]
    EmptyDocument,
}

/// Extracted information from one result page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// One entry per accepted row, in page order
    pub records: Vec<RawRecord>,

    /// Total records the source reports for the unit, if shown
    pub total_count: Option<u64>,

    /// Whether the unit continues on the next page
    pub has_more: bool,

    /// Rows matched but rejected for having too few cells
    pub skipped_rows: usize,
}

impl ParsedPage {
    /// A page with no records and nothing after it
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Turns page content into records
pub trait PageParser: Send + Sync {
    fn parse(&self, content: &str) -> Result<ParsedPage, ParseError>;
}

/// How "is there another page" is decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationPolicy {
    /// Records per full page
    pub page_size: u32,

    /// Ignore the full-page fallback and trust only the next affordance
    pub strict: bool,
}

/// Decides whether a unit continues after the current page
///
/// In order:
/// 1. An explicit next-page affordance means more pages.
/// 2. In strict mode, its absence means this was the last page.
/// 3. Otherwise a full page (at least `page_size` rows) is assumed to have a
///    successor. This costs one extra empty fetch when the last page happens
///    to be exactly full.
pub fn has_more_pages(next_affordance: bool, row_count: usize, policy: &PaginationPolicy) -> bool {
    if next_affordance {
        return true;
    }
    if policy.strict {
        return false;
    }
    policy.page_size > 0 && row_count >= policy.page_size as usize
}

/// Pages the source needs for `total` records, rounded up
pub fn estimate_total_pages(total: u64, page_size: u32) -> Option<u32> {
    if total == 0 || page_size == 0 {
        return None;
    }
    let pages = total.div_ceil(u64::from(page_size));
    Some(u32::try_from(pages).unwrap_or(u32::MAX))
}

/// Parses HTML result tables
///
/// Selectors and the total pattern are compiled once at construction.
pub struct HtmlTableParser {
    row_selector: Selector,
    cell_selector: Selector,
    link_selector: Selector,
    anchor_selector: Selector,
    total_selector: Option<Selector>,
    total_pattern: Regex,
    next_link_text: Option<String>,
    link_base: Option<Url>,
    min_cells: usize,
    columns: Vec<ColumnConfig>,
    policy: PaginationPolicy,
}

impl HtmlTableParser {
    /// Builds a parser from the parser configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Row selector, columns and pagination hints
    /// * `policy` - Next-page decision policy
    ///
    /// # Returns
    ///
    /// * `Ok(HtmlTableParser)` - Ready to parse
    /// * `Err(ConfigError)` - A selector, pattern or link base is invalid
    pub fn new(config: &ParserConfig, policy: PaginationPolicy) -> Result<Self, ConfigError> {
        let total_selector = match &config.total_selector {
            Some(selector) => Some(compile_selector(selector)?),
            None => None,
        };

        let total_pattern = Regex::new(&config.total_pattern)
            .map_err(|e| ConfigError::InvalidPattern(format!("{}: {}", config.total_pattern, e)))?;

        let link_base = match &config.link_base {
            Some(base) => Some(
                Url::parse(base).map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", base, e)))?,
            ),
            None => None,
        };

        Ok(Self {
            row_selector: compile_selector(&config.row_selector)?,
            cell_selector: compile_selector("td")?,
            link_selector: compile_selector("a[href]")?,
            anchor_selector: compile_selector("a")?,
            total_selector,
            total_pattern,
            next_link_text: config.next_link_text.clone(),
            link_base,
            min_cells: config.min_cells,
            columns: config.columns.clone(),
            policy,
        })
    }

    fn extract_row(&self, cells: &[ElementRef<'_>]) -> RawRecord {
        let mut raw = RawRecord::new();
        for column in &self.columns {
            let Some(cell) = cells.get(column.index) else {
                continue;
            };
            let value = match column.kind {
                ColumnKind::Text => clean_text(cell),
                ColumnKind::Link => self.extract_link(cell).unwrap_or_default(),
            };
            raw.insert(column.name.clone(), value);
        }
        raw
    }

    fn extract_link(&self, cell: &ElementRef<'_>) -> Option<String> {
        let href = cell
            .select(&self.link_selector)
            .next()?
            .value()
            .attr("href")?
            .trim();

        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            return None;
        }

        match &self.link_base {
            Some(base) => base.join(href).ok().map(|url| url.to_string()),
            None => Some(href.to_string()),
        }
    }

    fn extract_total(&self, document: &Html) -> Option<u64> {
        let selector = self.total_selector.as_ref()?;
        let text = document
            .select(selector)
            .map(|element| clean_text(&element))
            .collect::<Vec<_>>()
            .join(" ");

        self.total_pattern
            .captures(&text)?
            .get(1)?
            .as_str()
            .replace(',', "")
            .parse()
            .ok()
    }

    fn has_next_link(&self, document: &Html) -> bool {
        document.select(&self.anchor_selector).any(|anchor| {
            let rel_next = anchor
                .value()
                .attr("rel")
                .map(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("next")))
                .unwrap_or(false);
            let text_next = self
                .next_link_text
                .as_deref()
                .map(|text| clean_text(&anchor) == text)
                .unwrap_or(false);
            rel_next || text_next
        })
    }
}

impl PageParser for HtmlTableParser {
    fn parse(&self, content: &str) -> Result<ParsedPage, ParseError> {
        if content.trim().is_empty() {
            return Err(ParseError::EmptyDocument);
        }

        let document = Html::parse_document(content);
        let rows: Vec<ElementRef<'_>> = document.select(&self.row_selector).collect();
        if rows.is_empty() {
            return Ok(ParsedPage::empty());
        }

        let mut records = Vec::with_capacity(rows.len());
        let mut skipped_rows = 0;
        for (index, row) in rows.iter().enumerate() {
            let cells: Vec<ElementRef<'_>> = row.select(&self.cell_selector).collect();
            if cells.len() < self.min_cells {
                tracing::debug!(
                    "Skipping row {} with {} cells (need {})",
                    index + 1,
                    cells.len(),
                    self.min_cells
                );
                skipped_rows += 1;
                continue;
            }
            records.push(self.extract_row(&cells));
        }

        let next_affordance = self.has_next_link(&document);
        Ok(ParsedPage {
            records,
            total_count: self.extract_total(&document),
            has_more: has_more_pages(next_affordance, rows.len(), &self.policy),
            skipped_rows,
        })
    }
}

fn compile_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::Validation(format!("Invalid selector '{}': {:?}", selector, e)))
}

/// Text content with runs of whitespace collapsed
fn clean_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
