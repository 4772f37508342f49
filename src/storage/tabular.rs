//! CSV backend

use crate::model::SchemeRecord;
use crate::storage::scheme_path;
use crate::storage::traits::{RecordSink, StorageResult};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// Column order of every CSV file
pub const CSV_HEADER: [&str; 11] = [
    "department_name",
    "sub_department_name",
    "scheme_name",
    "scheme_description",
    "eligibility_criteria",
    "required_documents",
    "benefits",
    "district",
    "taluka",
    "application_mode",
    "official_links",
];

/// Appends rows to `<root>/<department>/<scheme>.csv`, writing the header once
pub struct CsvSink {
    root: PathBuf,
    lock: Mutex<()>,
}

impl CsvSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: Mutex::new(()),
        }
    }
}

fn row(record: &SchemeRecord) -> [String; 11] {
    [
        record.department_name.clone(),
        record.sub_department_name.clone(),
        record.scheme_name.clone(),
        record.scheme_description.clone(),
        record.eligibility_criteria.clone(),
        record.required_documents.clone(),
        record.benefits.clone(),
        record.district.clone(),
        record.taluka.clone(),
        record.application_mode.clone(),
        record.official_links.join("|"),
    ]
}

impl RecordSink for CsvSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn write(&self, record: &SchemeRecord) -> StorageResult<()> {
        let path = scheme_path(&self.root, record, "csv")?;

        // Header check and append must not interleave with another writer
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let needs_header = std::fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer.write_record(CSV_HEADER)?;
        }
        writer.write_record(row(record))?;
        writer.flush()?;
        Ok(())
    }
}
