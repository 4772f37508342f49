//! Durable set of completed work keys
//!
//! The ledger lives in `resume_state.json` as `{"completed": [...]}`. Keys are
//! only ever added. Each addition rewrites the file through a temporary sibling
//! and a rename, so an interrupted write leaves the previous ledger intact.

use crate::storage::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    completed: Vec<String>,
}

#[derive(Debug)]
pub struct ResumeLedger {
    path: PathBuf,
    completed: Vec<String>,
    index: HashSet<String>,
}

impl ResumeLedger {
    /// Opens the ledger at `path`, starting empty when the file does not exist
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str::<LedgerFile>(&content)
                .map_err(|e| StorageError::Serialization(format!("{}: {}", path.display(), e)))?
        } else {
            LedgerFile::default()
        };

        let index = file.completed.iter().cloned().collect();
        Ok(Self {
            path: path.to_path_buf(),
            completed: file.completed,
            index,
        })
    }

    pub fn is_done(&self, key: &str) -> bool {
        self.index.contains(key)
    }

    /// Records `key` as complete and flushes the ledger to disk
    pub fn mark_done(&mut self, key: &str) -> StorageResult<()> {
        if !self.index.insert(key.to_string()) {
            return Ok(());
        }
        self.completed.push(key.to_string());
        self.flush()
    }

    pub fn len(&self) -> usize {
        self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> StorageResult<()> {
        let file = LedgerFile {
            completed: self.completed.clone(),
        };
        let encoded = serde_json::to_string_pretty(&file)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, encoded)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
