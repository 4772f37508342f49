//! Database schema definitions
//!
//! The uniqueness constraint on the 5-tuple makes `INSERT OR IGNORE` idempotent
//! across runs, independently of the in-memory dedupe set.

use rusqlite::Connection;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schemes (
    department_name TEXT,
    sub_department_name TEXT,
    scheme_name TEXT,
    scheme_description TEXT,
    eligibility_criteria TEXT,
    required_documents TEXT,
    benefits TEXT,
    district TEXT,
    taluka TEXT,
    application_mode TEXT,
    official_links TEXT,
    UNIQUE(department_name, sub_department_name, scheme_name, district, taluka)
);

CREATE INDEX IF NOT EXISTS idx_schemes_department ON schemes(department_name);
CREATE INDEX IF NOT EXISTS idx_schemes_district ON schemes(district);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
