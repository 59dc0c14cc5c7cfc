//! Storage module for the two durable artifacts of a crawl
//!
//! - The progress document: per-unit pagination state, rewritten whole on
//!   every checkpoint
//! - The record sink: append-only store of unique records

mod progress_store;
mod record;
mod schema;
mod sqlite;
mod traits;

pub use progress_store::ProgressStore;
pub use record::{RawRecord, Record, RecordError, RecordSchema};
pub use sqlite::SqliteRecordSink;
pub use traits::{RecordSink, StorageError, StorageResult};
