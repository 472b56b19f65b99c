//! Append-only snapshot log of committed revisions.
//!
//! Records are kept newest-first with a fixed capacity; the in-document
//! history region is the chronologically ascending counterpart and the two
//! orderings are independent contracts. A corrupt store file degrades to an
//! empty list instead of blocking the rest of the system.

use crate::config::Config;
use crate::constant::MAX_HISTORY_RECORDS;
use crate::types::HistoryRecord;
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

const HISTORY_FILE: &str = "history.json";

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Retrieval filter: doc-id match first, title equality for legacy records
/// that predate identity linkage.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub doc_id: Option<String>,
    pub doc_title: Option<String>,
}

impl HistoryFilter {
    fn matches(&self, record: &HistoryRecord) -> bool {
        if let (Some(want), Some(have)) = (&self.doc_id, &record.doc_id) {
            if want == have {
                return true;
            }
        }
        if record.doc_id.is_none() {
            if let Some(title) = &self.doc_title {
                return *title == record.doc_title;
            }
        }
        false
    }
}

pub struct HistoryStore {
    path: PathBuf,
    records: Vec<HistoryRecord>,
}

impl HistoryStore {
    /// Open the store under the application data directory
    pub fn new() -> Result<Self, HistoryError> {
        let config = Config::default();
        let data_dir = config.data_dir();
        fs::create_dir_all(&data_dir)?;
        Ok(Self::open(data_dir.join(HISTORY_FILE)))
    }

    /// Open a store backed by an explicit file path
    pub fn open(path: PathBuf) -> Self {
        let records = Self::load(&path);
        Self { path, records }
    }

    fn load(path: &PathBuf) -> Vec<HistoryRecord> {
        if !path.exists() {
            return Vec::new();
        }
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read history store {:?}: {}", path, e);
                return Vec::new();
            }
        };
        match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => {
                warn!("History store {:?} is corrupt, starting empty: {}", path, e);
                Vec::new()
            }
        }
    }

    /// Prepend a record; oldest records are evicted past the capacity.
    /// Persisting is best-effort, a failed write never fails the append.
    pub fn append(&mut self, record: HistoryRecord) {
        self.records.insert(0, record);
        self.records.truncate(MAX_HISTORY_RECORDS);
        if let Err(e) = self.save() {
            warn!("Failed to persist history store: {}", e);
        }
    }

    /// All records, newest first
    pub fn list(&self) -> &[HistoryRecord] {
        &self.records
    }

    /// Records matching the filter, newest first
    pub fn list_filtered(&self, filter: &HistoryFilter) -> Vec<HistoryRecord> {
        self.records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        if self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                warn!("Failed to remove history store {:?}: {}", self.path, e);
            }
        }
    }

    fn save(&self) -> Result<(), HistoryError> {
        let content = serde_json::to_string_pretty(&self.records)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn setup_test_store() -> (HistoryStore, PathBuf) {
        let test_dir = std::env::temp_dir().join(format!("test_history_{}", Uuid::new_v4()));
        fs::create_dir_all(&test_dir).unwrap();
        let store = HistoryStore::open(test_dir.join(HISTORY_FILE));
        (store, test_dir)
    }

    fn cleanup_test_dir(test_dir: &PathBuf) {
        let _ = fs::remove_dir_all(test_dir);
    }

    fn record(version: &str, doc_id: Option<&str>, title: &str) -> HistoryRecord {
        HistoryRecord {
            id: Uuid::new_v4().to_string(),
            doc_id: doc_id.map(str::to_string),
            timestamp: Utc::now(),
            version: version.to_string(),
            summary: format!("summary {}", version),
            full_content: format!("content {}", version),
            doc_title: title.to_string(),
        }
    }

    #[test]
    fn append_is_newest_first() {
        let (mut store, test_dir) = setup_test_store();

        store.append(record("1.0.0", Some("d1"), "Doc"));
        store.append(record("1.1.0", Some("d1"), "Doc"));

        assert_eq!(store.list()[0].version, "1.1.0");
        assert_eq!(store.list()[1].version, "1.0.0");

        cleanup_test_dir(&test_dir);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let (mut store, test_dir) = setup_test_store();

        for i in 0..(MAX_HISTORY_RECORDS + 1) {
            store.append(record(&format!("1.0.{}", i), Some("d1"), "Doc"));
        }

        assert_eq!(store.list().len(), MAX_HISTORY_RECORDS);
        // The very first append fell off the end
        assert_eq!(store.list().last().unwrap().version, "1.0.1");
        assert_eq!(store.list()[0].version, format!("1.0.{}", MAX_HISTORY_RECORDS));

        cleanup_test_dir(&test_dir);
    }

    #[test]
    fn filter_matches_doc_id_and_legacy_title() {
        let (mut store, test_dir) = setup_test_store();

        store.append(record("1.0.0", Some("d1"), "Doc A"));
        store.append(record("1.1.0", Some("d2"), "Doc B"));
        store.append(record("0.9.0", None, "Doc A"));
        store.append(record("0.8.0", None, "Doc C"));

        let filter = HistoryFilter {
            doc_id: Some("d1".to_string()),
            doc_title: Some("Doc A".to_string()),
        };
        let matched = store.list_filtered(&filter);
        let versions: Vec<&str> = matched.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(versions, vec!["0.9.0", "1.0.0"]);

        cleanup_test_dir(&test_dir);
    }

    #[test]
    fn records_persist_across_reopen() {
        let (mut store, test_dir) = setup_test_store();

        store.append(record("1.0.0", Some("d1"), "Doc"));
        let reopened = HistoryStore::open(test_dir.join(HISTORY_FILE));
        assert_eq!(reopened.list().len(), 1);
        assert_eq!(reopened.list()[0].version, "1.0.0");

        cleanup_test_dir(&test_dir);
    }

    #[test]
    fn corrupt_store_degrades_to_empty() {
        let test_dir = std::env::temp_dir().join(format!("test_history_{}", Uuid::new_v4()));
        fs::create_dir_all(&test_dir).unwrap();
        let path = test_dir.join(HISTORY_FILE);
        fs::write(&path, "{ not valid json").unwrap();

        let store = HistoryStore::open(path);
        assert!(store.list().is_empty());

        cleanup_test_dir(&test_dir);
    }

    #[test]
    fn clear_empties_store_and_file() {
        let (mut store, test_dir) = setup_test_store();

        store.append(record("1.0.0", Some("d1"), "Doc"));
        store.clear();
        assert!(store.list().is_empty());

        let reopened = HistoryStore::open(test_dir.join(HISTORY_FILE));
        assert!(reopened.list().is_empty());

        cleanup_test_dir(&test_dir);
    }
}
