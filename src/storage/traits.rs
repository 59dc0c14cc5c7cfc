//! Storage traits and error types
//!
//! This module defines the record sink interface and the errors shared by
//! both durable artifacts (progress document and record sink).

use crate::domain::UnitKey;
use crate::storage::Record;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Record fields changed: sink has {stored:?}, configuration has {configured:?}")]
    SchemaMismatch {
        stored: Vec<String>,
        configured: Vec<String>,
    },

    #[error("Lock poisoned: {0}")]
    LockPoisoned(&'static str),
}

impl StorageError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Append-only destination for newly discovered records
///
/// Implementations serialize concurrent appends behind their own lock.
/// Records reaching `append` have already won their dedup claim.
pub trait RecordSink: Send + Sync {
    /// Appends a batch, returning how many records were written
    fn append(&self, unit: &UnitKey, records: &[Record]) -> StorageResult<usize>;

    /// Every record key already stored, used to seed the dedup index
    fn existing_keys(&self) -> StorageResult<Vec<String>>;

    /// Number of stored records
    fn count(&self) -> StorageResult<u64>;
}
