//! SQLite record backend

use crate::model::SchemeRecord;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RecordSink, StorageResult};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// Writes records into the `schemes` table with insert-or-ignore semantics
pub struct SqliteSink {
    conn: Mutex<Connection>,
}

impl SqliteSink {
    /// Opens (or creates) the database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Number of stored rows
    pub fn count(&self) -> StorageResult<i64> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(conn.query_row("SELECT COUNT(*) FROM schemes", [], |row| row.get(0))?)
    }
}

impl RecordSink for SqliteSink {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn write(&self, record: &SchemeRecord) -> StorageResult<()> {
        let links = serde_json::to_string(&record.official_links)?;
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute(
            "INSERT OR IGNORE INTO schemes VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.department_name,
                record.sub_department_name,
                record.scheme_name,
                record.scheme_description,
                record.eligibility_criteria,
                record.required_documents,
                record.benefits,
                record.district,
                record.taluka,
                record.application_mode,
                links,
            ],
        )?;
        Ok(())
    }
}
