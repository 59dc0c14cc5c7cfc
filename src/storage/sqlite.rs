//! SQLite record sink
//!
//! This module provides a SQLite-based implementation of the RecordSink trait.

use crate::domain::UnitKey;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RecordSink, StorageError, StorageResult};
use crate::storage::{Record, RecordSchema};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed record sink
///
/// The connection sits behind its own mutex, separate from the progress
/// document and the dedup index.
pub struct SqliteRecordSink {
    conn: Mutex<Connection>,
}

impl SqliteRecordSink {
    /// Opens or creates the record database
    ///
    /// A new database gets the schema's field list written first; an existing
    /// one must have been created with the same fields.
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteRecordSink)` - Database ready for appends
    /// * `Err(StorageError::SchemaMismatch)` - Stored fields differ from `schema`
    pub fn open(path: &Path, schema: &RecordSchema) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        Self::from_connection(conn, schema)
    }

    /// Creates an in-memory sink (for testing)
    #[cfg(test)]
    pub fn new_in_memory(schema: &RecordSchema) -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?, schema)
    }

    /// Counts records in an existing database without checking its field list
    ///
    /// Returns 0 when the database does not exist yet.
    pub fn count_at(path: &Path) -> StorageResult<u64> {
        if !path.exists() {
            return Ok(0);
        }
        let conn = Connection::open(path)?;
        initialize_schema(&conn)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn from_connection(conn: Connection, schema: &RecordSchema) -> StorageResult<Self> {
        initialize_schema(&conn)?;
        ensure_fields(&conn, schema.fields())?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::LockPoisoned("record sink"))
    }
}

/// Writes the field list on first use, checks it afterwards
fn ensure_fields(conn: &Connection, configured: &[String]) -> StorageResult<()> {
    let stored = {
        let mut stmt = conn.prepare("SELECT name FROM record_fields ORDER BY position")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        names
    };

    if stored.is_empty() {
        for (position, name) in configured.iter().enumerate() {
            conn.execute(
                "INSERT INTO record_fields (position, name) VALUES (?1, ?2)",
                params![position as i64, name],
            )?;
        }
        tracing::debug!("Created record sink with fields {:?}", configured);
        return Ok(());
    }

    if stored != configured {
        return Err(StorageError::SchemaMismatch {
            stored,
            configured: configured.to_vec(),
        });
    }

    Ok(())
}

impl RecordSink for SqliteRecordSink {
    fn append(&self, unit: &UnitKey, records: &[Record]) -> StorageResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let now = Utc::now().to_rfc3339();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO records (key, unit_parent, unit_child, data, discovered_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for record in records {
                let data = serde_json::to_string(&record.fields)?;
                written += stmt.execute(params![
                    record.key,
                    unit.parent,
                    unit.child,
                    data,
                    now
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!("Saved {} new records for {}", written, unit);
        Ok(written)
    }

    fn existing_keys(&self) -> StorageResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT key FROM records")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    fn count(&self) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
