//! Deduplicating fan-in over every configured backend

use crate::model::{DedupeKey, SchemeRecord};
use crate::storage::traits::{RecordSink, StorageResult};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Per-key progress: which backends already hold the record
#[derive(Debug)]
struct KeyProgress {
    in_flight: bool,
    complete: bool,
    written: Vec<bool>,
}

/// Routes each new record to every backend, suppressing repeats within a run
///
/// The seen-set only lives for the process; cross-run protection comes from the
/// resume ledger and the SQLite uniqueness constraint. A backend that accepted
/// a key is never handed the same key again, even when a sibling backend
/// failed and the key is retried.
pub struct PersistenceSink {
    backends: Vec<Box<dyn RecordSink>>,
    seen: Mutex<HashMap<DedupeKey, KeyProgress>>,
}

impl PersistenceSink {
    pub fn new(backends: Vec<Box<dyn RecordSink>>) -> Self {
        Self {
            backends,
            seen: Mutex::new(HashMap::new()),
        }
    }

    fn seen(&self) -> MutexGuard<'_, HashMap<DedupeKey, KeyProgress>> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persists `record` unless its dedupe key was already written this run
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The record was new and every backend now holds it
    /// * `Ok(false)` - The record was a duplicate and nothing was written
    /// * `Err(StorageError)` - A backend failed; backends that succeeded keep the record
    pub fn persist(&self, record: &SchemeRecord) -> StorageResult<bool> {
        let key = record.dedupe_key();
        let mut written = {
            let mut seen = self.seen();
            let progress = seen.entry(key.clone()).or_insert_with(|| KeyProgress {
                in_flight: false,
                complete: false,
                written: vec![false; self.backends.len()],
            });
            if progress.complete || progress.in_flight {
                return Ok(false);
            }
            progress.in_flight = true;
            progress.written.clone()
        };

        let mut failure = None;
        for (index, backend) in self.backends.iter().enumerate() {
            if written[index] {
                continue;
            }
            match backend.write(record) {
                Ok(()) => written[index] = true,
                Err(e) => {
                    tracing::error!(
                        "{} backend failed for {} / {}: {}",
                        backend.name(),
                        record.scheme_name,
                        record.district,
                        e
                    );
                    failure = Some(e);
                    break;
                }
            }
        }

        let mut seen = self.seen();
        if let Some(progress) = seen.get_mut(&key) {
            progress.in_flight = false;
            progress.complete = failure.is_none();
            progress.written = written;
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(true),
        }
    }

    pub fn backend_names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Number of distinct records written so far
    pub fn written(&self) -> usize {
        self.seen().values().filter(|progress| progress.complete).count()
    }
}
