//! Shared fixtures for the integration tests

use async_trait::async_trait;
use pagewalk::config::{
    ColumnConfig, ColumnKind, Config, CrawlerConfig, OutputConfig, ParserConfig, SourceConfig,
};
use pagewalk::crawler::{Coordinator, FetchError, PageFetcher, PageParser, ParseError, ParsedPage};
use pagewalk::domain::WorkUnit;
use pagewalk::storage::RawRecord;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Creates a test configuration writing everything under `dir`
pub fn create_test_config(dir: &Path, base_url: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            workers: 4,
            page_delay_ms: 0,
            unit_delay_ms: 0,
            max_pages_per_unit: 1000,
            page_size: 10,
            strict_pagination: false,
        },
        source: SourceConfig {
            base_url: base_url.to_string(),
            page_param: "page".to_string(),
            params: BTreeMap::new(),
            timeout_secs: 5,
            max_retries: 1,
            retry_delay_ms: 10,
            user_agent: "pagewalk-test".to_string(),
        },
        parser: ParserConfig {
            row_selector: "table.table tbody tr".to_string(),
            min_cells: 2,
            total_selector: Some("div.dataTables_info".to_string()),
            total_pattern: r"of (\d+) entries".to_string(),
            next_link_text: Some("Next".to_string()),
            key_field: "id".to_string(),
            link_base: None,
            columns: vec![
                ColumnConfig {
                    name: "id".to_string(),
                    index: 0,
                    kind: ColumnKind::Text,
                    required: true,
                },
                ColumnConfig {
                    name: "name".to_string(),
                    index: 1,
                    kind: ColumnKind::Text,
                    required: false,
                },
            ],
        },
        output: OutputConfig {
            domain_path: dir.join("domain.json").display().to_string(),
            progress_path: dir.join("progress.json").display().to_string(),
            records_path: dir.join("records.db").display().to_string(),
        },
    }
}

/// Writes a one-group domain with the given item ids
pub fn write_domain(dir: &Path, children: &[&str]) {
    let items: Vec<_> = children
        .iter()
        .map(|id| serde_json::json!({ "id": id, "name": format!("District {}", id) }))
        .collect();
    let domain = serde_json::json!({
        "dimensions": ["division_id", "district_id"],
        "groups": [{ "id": "1", "name": "Division", "items": items }]
    });
    std::fs::write(dir.join("domain.json"), domain.to_string()).unwrap();
}

/// Pages served for one unit
#[derive(Debug, Clone, Copy)]
pub struct UnitScript {
    pub pages: u32,
    pub per_page: usize,
}

/// Fetcher serving scripted pages and recording every request
///
/// Page content is `prefix|page|count|more`, read back by `ScriptedParser`.
/// Record ids are `prefix-page-index`; with `shared_keys` every unit uses the
/// same prefix, so units serve overlapping records.
#[derive(Default)]
pub struct ScriptedFetcher {
    units: HashMap<String, UnitScript>,
    failures: HashSet<(String, u32)>,
    shared_keys: bool,
    calls: Mutex<Vec<(String, u32)>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unit(mut self, child: &str, pages: u32, per_page: usize) -> Self {
        self.units
            .insert(child.to_string(), UnitScript { pages, per_page });
        self
    }

    pub fn failing(mut self, child: &str, page: u32) -> Self {
        self.failures.insert((child.to_string(), page));
        self
    }

    pub fn shared_keys(mut self) -> Self {
        self.shared_keys = true;
        self
    }

    /// Requests made, sorted for order-independent assertions
    pub fn calls(&self) -> Vec<(String, u32)> {
        let mut calls = self.calls.lock().unwrap().clone();
        calls.sort();
        calls
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, unit: &WorkUnit, page: u32) -> Result<String, FetchError> {
        let child = unit.key.child.clone();
        self.calls.lock().unwrap().push((child.clone(), page));

        if self.failures.contains(&(child.clone(), page)) {
            return Err(FetchError::Status {
                url: format!("scripted://{}/{}", child, page),
                status: 503,
            });
        }

        let script = self.units.get(&child).copied().unwrap_or(UnitScript {
            pages: 0,
            per_page: 0,
        });
        let count = if page <= script.pages { script.per_page } else { 0 };
        let more = page < script.pages;
        let prefix = if self.shared_keys { "shared" } else { child.as_str() };
        Ok(format!("{}|{}|{}|{}", prefix, page, count, more))
    }
}

/// Parses the content produced by `ScriptedFetcher`
pub struct ScriptedParser;

impl PageParser for ScriptedParser {
    fn parse(&self, content: &str) -> Result<ParsedPage, ParseError> {
        let parts: Vec<&str> = content.split('|').collect();
        let [prefix, page, count, more] = parts.as_slice() else {
            return Err(ParseError::EmptyDocument);
        };
        let count: usize = count.parse().map_err(|_| ParseError::EmptyDocument)?;

        let records = (0..count)
            .map(|i| {
                let mut raw = RawRecord::new();
                raw.insert("id".to_string(), format!("{}-{}-{}", prefix, page, i));
                raw.insert("name".to_string(), format!("Record {}", i));
                raw
            })
            .collect();

        Ok(ParsedPage {
            records,
            total_count: None,
            has_more: *more == "true",
            skipped_rows: 0,
        })
    }
}

/// Coordinator over the scripted fetcher and parser
pub fn scripted_coordinator(config: Config, fetcher: Arc<ScriptedFetcher>) -> Coordinator {
    Coordinator::with_collaborators(config, false, fetcher, Arc::new(ScriptedParser))
        .expect("Failed to create coordinator")
}
