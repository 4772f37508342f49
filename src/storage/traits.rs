//! Storage traits and error types
//!
//! This module defines the interface every record backend implements and the
//! errors they share.

use crate::model::SchemeRecord;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A durable destination for scheme records
///
/// Backends are shared between concurrent fan-out tasks, so they must be
/// `Send + Sync` and serialize their own file or connection access.
pub trait RecordSink: Send + Sync {
    /// Short name used in log events
    fn name(&self) -> &'static str;

    /// Writes one record
    fn write(&self, record: &SchemeRecord) -> StorageResult<()>;
}
