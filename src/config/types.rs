use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure for Pagewalk
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub source: SourceConfig,
    pub parser: ParserConfig,
    pub output: OutputConfig,
}

/// Run pacing and bounds
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of units processed concurrently
    pub workers: u32,

    /// Pause between two pages of the same unit (milliseconds)
    #[serde(rename = "page-delay-ms")]
    pub page_delay_ms: u64,

    /// Pause a worker slot takes after finishing a unit (milliseconds)
    #[serde(rename = "unit-delay-ms")]
    pub unit_delay_ms: u64,

    /// Hard ceiling on pages walked for a single unit
    #[serde(rename = "max-pages-per-unit")]
    pub max_pages_per_unit: u32,

    /// Records the source serves per page
    #[serde(rename = "page-size")]
    pub page_size: u32,

    /// Only trust an explicit next-page link when deciding whether to continue
    #[serde(rename = "strict-pagination", default)]
    pub strict_pagination: bool,
}

impl CrawlerConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn unit_delay(&self) -> Duration {
        Duration::from_millis(self.unit_delay_ms)
    }
}

/// Remote source the pages are requested from
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Listing endpoint, queried once per page
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Query parameter carrying the page number
    #[serde(rename = "page-param", default = "default_page_param")]
    pub page_param: String,

    /// Fixed query parameters sent with every request
    #[serde(default)]
    pub params: BTreeMap<String, String>,

    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Extra attempts after a timeout, connection error or 5xx
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_user_agent() -> String {
    format!("pagewalk/{}", env!("CARGO_PKG_VERSION"))
}

/// How listing pages are turned into records
#[derive(Debug, Clone, Deserialize)]
pub struct ParserConfig {
    /// CSS selector matching one result row
    #[serde(rename = "row-selector")]
    pub row_selector: String,

    /// Rows with fewer cells are not records (headers, spacer rows)
    #[serde(rename = "min-cells", default)]
    pub min_cells: usize,

    /// Element holding the "showing x to y of z" text
    #[serde(rename = "total-selector", default)]
    pub total_selector: Option<String>,

    /// Regex with one capture group extracting the total record count
    #[serde(rename = "total-pattern", default = "default_total_pattern")]
    pub total_pattern: String,

    /// Link text of the next-page affordance
    #[serde(rename = "next-link-text", default = "default_next_link_text")]
    pub next_link_text: Option<String>,

    /// Column whose value uniquely identifies a record
    #[serde(rename = "key-field")]
    pub key_field: String,

    /// Base URL for resolving relative links in link columns
    #[serde(rename = "link-base", default)]
    pub link_base: Option<String>,

    pub columns: Vec<ColumnConfig>,
}

fn default_total_pattern() -> String {
    r"of (\d+) entries".to_string()
}

fn default_next_link_text() -> Option<String> {
    Some("Next".to_string())
}

impl ParserConfig {
    /// Names of all columns, in declaration order
    pub fn field_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// One cell of a result row mapped to a named field
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnConfig {
    pub name: String,

    /// Zero-based cell index in the row
    pub index: usize,

    #[serde(default)]
    pub kind: ColumnKind,

    /// Rows missing this field are skipped
    #[serde(default)]
    pub required: bool,
}

/// What to take out of a cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Whitespace-normalized text content
    #[default]
    Text,
    /// Absolute href of the first link in the cell
    Link,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// JSON domain description to enumerate
    #[serde(rename = "domain-path")]
    pub domain_path: String,

    /// JSON progress document, rewritten on every checkpoint
    #[serde(rename = "progress-path")]
    pub progress_path: String,

    /// SQLite database the records are appended to
    #[serde(rename = "records-path")]
    pub records_path: String,
}
