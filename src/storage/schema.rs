//! Record sink schema definitions
//!
//! This module contains the SQL schema for the record database.

/// SQL schema for the record database
pub const SCHEMA_SQL: &str = r#"
-- Ordered field names, written once when the sink is created
CREATE TABLE IF NOT EXISTS record_fields (
    position INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

-- One row per unique record
CREATE TABLE IF NOT EXISTS records (
    key TEXT PRIMARY KEY,
    unit_parent TEXT NOT NULL,
    unit_child TEXT NOT NULL,
    data TEXT NOT NULL,
    discovered_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_unit ON records(unit_parent, unit_child);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
