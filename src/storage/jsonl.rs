//! Line-delimited JSON backend

use crate::model::SchemeRecord;
use crate::storage::traits::{RecordSink, StorageResult};
use crate::storage::scheme_path;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// Appends one JSON object per record to `<root>/<department>/<scheme>.json`
pub struct JsonLinesSink {
    root: PathBuf,
    lock: Mutex<()>,
}

impl JsonLinesSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: Mutex::new(()),
        }
    }
}

impl RecordSink for JsonLinesSink {
    fn name(&self) -> &'static str {
        "json"
    }

    fn write(&self, record: &SchemeRecord) -> StorageResult<()> {
        let path = scheme_path(&self.root, record, "json")?;
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}
