//! Progress document types
//!
//! `ProgressState` is the whole resumable state of a crawl. It is owned by
//! the progress store; everything here is plain data plus the merge rule
//! applied on each checkpoint.

use crate::domain::UnitKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current layout version of the progress document
pub const PROGRESS_VERSION: u32 = 1;

/// Pagination progress of one work unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    /// Last page fully processed and checkpointed (0 = none)
    #[serde(default)]
    pub last_page: u32,

    /// Estimated page count, once the source has reported a total
    #[serde(default)]
    pub total_pages: Option<u32>,

    /// Terminal: the unit reported no further pages
    #[serde(default)]
    pub completed: bool,
}

/// One page's worth of progress to merge into the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub unit: UnitKey,
    pub page: u32,
    pub total_pages: Option<u32>,
    pub completed: bool,
    pub new_records: u64,
}

/// The full persisted progress document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressState {
    #[serde(default = "current_version")]
    pub version: u32,

    #[serde(with = "unit_entries", default)]
    pub units: BTreeMap<UnitKey, ProgressEntry>,

    /// New records found across every run sharing this document
    #[serde(default)]
    pub new_records_found: u64,

    pub start_time: DateTime<Utc>,

    pub last_update: DateTime<Utc>,

    /// Unit of the most recent checkpoint
    #[serde(default)]
    pub current_unit: Option<UnitKey>,

    /// SHA-256 of the domain description this progress belongs to
    #[serde(default)]
    pub domain_hash: Option<String>,
}

fn current_version() -> u32 {
    PROGRESS_VERSION
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressState {
    /// Empty progress stamped with the current time
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            version: PROGRESS_VERSION,
            units: BTreeMap::new(),
            new_records_found: 0,
            start_time: now,
            last_update: now,
            current_unit: None,
            domain_hash: None,
        }
    }

    pub fn entry(&self, key: &UnitKey) -> Option<&ProgressEntry> {
        self.units.get(key)
    }

    pub fn is_completed(&self, key: &UnitKey) -> bool {
        self.entry(key).map(|e| e.completed).unwrap_or(false)
    }

    /// Merges a checkpoint into the document
    ///
    /// `last_page` only moves forward, `total_pages` is kept from the first
    /// time it was known, and `completed` is never cleared.
    pub fn apply(&mut self, checkpoint: &Checkpoint) {
        let entry = self.units.entry(checkpoint.unit.clone()).or_default();

        if checkpoint.page >= entry.last_page {
            entry.last_page = checkpoint.page;
        } else {
            tracing::warn!(
                "Ignoring backwards checkpoint for {}: page {} < {}",
                checkpoint.unit,
                checkpoint.page,
                entry.last_page
            );
        }

        if entry.total_pages.is_none() {
            entry.total_pages = checkpoint.total_pages;
        }

        if checkpoint.completed {
            entry.completed = true;
        }

        self.new_records_found += checkpoint.new_records;
        self.last_update = Utc::now();
        self.current_unit = Some(checkpoint.unit.clone());
    }

    /// Units marked completed
    pub fn completed_count(&self) -> usize {
        self.units.values().filter(|e| e.completed).count()
    }

    /// Units with at least one page done but not completed
    pub fn in_progress_count(&self) -> usize {
        self.units
            .values()
            .filter(|e| !e.completed && e.last_page > 0)
            .count()
    }

    /// Sum of checkpointed pages over all units
    pub fn pages_processed(&self) -> u64 {
        self.units.values().map(|e| e.last_page as u64).sum()
    }
}

/// Stores the unit map as a list of `{ key, last_page, ... }` objects
///
/// JSON object keys must be strings, and flattening a structured key into
/// one would bring back the separator problem.
mod unit_entries {
    use super::ProgressEntry;
    use crate::domain::UnitKey;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct EntryRef<'a> {
        key: &'a UnitKey,
        #[serde(flatten)]
        entry: &'a ProgressEntry,
    }

    #[derive(Deserialize)]
    struct EntryOwned {
        key: UnitKey,
        #[serde(flatten)]
        entry: ProgressEntry,
    }

    pub fn serialize<S>(
        units: &BTreeMap<UnitKey, ProgressEntry>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(units.iter().map(|(key, entry)| EntryRef { key, entry }))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<UnitKey, ProgressEntry>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = Vec::<EntryOwned>::deserialize(deserializer)?;
        Ok(entries.into_iter().map(|e| (e.key, e.entry)).collect())
    }
}
