//! Storage module for persisting scheme records
//!
//! This module handles every durable output of a run:
//! - Line-delimited JSON and CSV files per department and scheme
//! - An optional SQLite table with insert-or-ignore idempotence
//! - The in-run dedupe set in front of all of them

mod jsonl;
mod schema;
mod sink;
mod sqlite;
mod tabular;
mod traits;

pub use jsonl::JsonLinesSink;
pub use schema::{initialize_schema, SCHEMA_SQL};
pub use sink::PersistenceSink;
pub use sqlite::SqliteSink;
pub use tabular::{CsvSink, CSV_HEADER};
pub use traits::{RecordSink, StorageError, StorageResult};

use crate::config::Config;
use crate::model::SchemeRecord;
use std::path::{Path, PathBuf};

/// Builds the sink for the configured output format and database
pub fn open_sink(config: &Config) -> StorageResult<PersistenceSink> {
    std::fs::create_dir_all(&config.output_dir)?;

    let mut backends: Vec<Box<dyn RecordSink>> = Vec::new();
    if config.output_format.writes_json() {
        backends.push(Box::new(JsonLinesSink::new(&config.output_dir)));
    }
    if config.output_format.writes_csv() {
        backends.push(Box::new(CsvSink::new(&config.output_dir)));
    }
    if let Some(path) = &config.sqlite_path {
        backends.push(Box::new(SqliteSink::new(path)?));
    }

    Ok(PersistenceSink::new(backends))
}

/// Replaces every character other than alphanumerics, `-` and `_` with `_`
///
/// Leading and trailing underscores are trimmed; an empty result becomes `unknown`.
pub fn safe_filename(value: &str) -> String {
    let replaced: String = value
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = replaced.trim_matches('_');
    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `<root>/<department>/<scheme>.<extension>`, creating the department folder
pub(crate) fn scheme_path(root: &Path, record: &SchemeRecord, extension: &str) -> StorageResult<PathBuf> {
    let folder = root.join(safe_filename(&record.department_name));
    std::fs::create_dir_all(&folder)?;
    Ok(folder.join(format!("{}.{}", safe_filename(&record.scheme_name), extension)))
}
