//! Run statistics
//!
//! Counters kept by the coordinator while a run progresses, logged as a
//! summary at the end.

use serde::Serialize;
use std::time::Duration;

/// Where a scheme's base record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    /// Structured (JSON) response of the detail address
    Structured,
    /// HTML fallback of the same address
    Markup,
}

/// Counters for one harvesting run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Sub-departments visited after the department filter
    pub sub_departments: u64,

    /// Scheme handles returned by listing pagination
    pub schemes_discovered: u64,

    /// Schemes skipped because the resume ledger already had them
    pub skipped_resumed: u64,

    /// Base records built from the structured payload
    pub extracted_structured: u64,

    /// Base records built from the markup fallback
    pub extracted_markup: u64,

    /// Schemes left unmarked because extraction, dropdowns or persistence failed
    pub failed: u64,

    /// Geography variants accepted by the sink
    pub records_written: u64,

    /// Geography variants suppressed by the in-run dedupe set
    pub duplicates_suppressed: u64,
}

impl RunStats {
    pub fn record_extraction(&mut self, source: ExtractionSource) {
        match source {
            ExtractionSource::Structured => self.extracted_structured += 1,
            ExtractionSource::Markup => self.extracted_markup += 1,
        }
    }

    /// Schemes whose base record was built, by either path
    pub fn extracted(&self) -> u64 {
        self.extracted_structured + self.extracted_markup
    }

    /// Logs the end-of-run summary
    pub fn log_summary(&self, elapsed: Duration) {
        tracing::info!("=== Harvest Summary ===");
        tracing::info!(
            "Sub-departments: {}, schemes discovered: {}, skipped via resume: {}",
            self.sub_departments,
            self.schemes_discovered,
            self.skipped_resumed
        );
        tracing::info!(
            "Extracted: {} ({} structured, {} markup), failed: {}",
            self.extracted(),
            self.extracted_structured,
            self.extracted_markup,
            self.failed
        );
        tracing::info!(
            "Records written: {}, duplicates suppressed: {}",
            self.records_written,
            self.duplicates_suppressed
        );
        tracing::info!("Finished in {:.1}s", elapsed.as_secs_f64());
    }
}
