use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("failed to access history file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse history file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One tracked mole observation. Stores the probability vector from a prior
/// prediction so the tracking UI can chart changes over time; the analysis
/// pipeline itself never reads these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoleRecord {
    pub id: String,
    pub recorded_at: DateTime<Utc>,
    pub image_filename: String,
    pub probabilities: Vec<f64>,
}

/// JSON-file-backed record store keyed by mole id. Every mutation is
/// written through before it returns.
pub struct MoleHistory {
    path: PathBuf,
    records: Mutex<BTreeMap<String, MoleRecord>>,
}

impl MoleHistory {
    pub fn open(path: &Path) -> Result<Self, HistoryError> {
        let records = if path.exists() {
            let json = std::fs::read_to_string(path)?;
            let list: Vec<MoleRecord> = serde_json::from_str(&json)?;
            list.into_iter().map(|r| (r.id.clone(), r)).collect()
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            records: Mutex::new(records),
        })
    }

    pub fn list(&self) -> Vec<MoleRecord> {
        self.records.lock().values().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<MoleRecord> {
        self.records.lock().get(id).cloned()
    }

    pub fn upsert(&self, record: MoleRecord) -> Result<(), HistoryError> {
        let mut records = self.records.lock();
        records.insert(record.id.clone(), record);
        self.persist(&records)
    }

    /// Returns whether a record was present.
    pub fn remove(&self, id: &str) -> Result<bool, HistoryError> {
        let mut records = self.records.lock();
        let removed = records.remove(id).is_some();
        if removed {
            self.persist(&records)?;
        }
        Ok(removed)
    }

    fn persist(&self, records: &BTreeMap<String, MoleRecord>) -> Result<(), HistoryError> {
        let list: Vec<&MoleRecord> = records.values().collect();
        let json = serde_json::to_vec_pretty(&list)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> MoleRecord {
        MoleRecord {
            id: id.into(),
            recorded_at: "2025-06-01T12:00:00Z".parse().unwrap(),
            image_filename: format!("{id}.jpg"),
            probabilities: vec![0.02, 0.82, 0.01, 0.01, 0.05, 0.02, 0.02, 0.05, 0.0],
        }
    }

    #[test]
    fn upsert_and_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let history = MoleHistory::open(&dir.path().join("moles.json")).unwrap();

        history.upsert(record("left-arm")).unwrap();
        assert_eq!(history.get("left-arm"), Some(record("left-arm")));
        assert_eq!(history.get("missing"), None);
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("moles.json");

        let history = MoleHistory::open(&path).unwrap();
        history.upsert(record("a")).unwrap();
        history.upsert(record("b")).unwrap();
        drop(history);

        let reopened = MoleHistory::open(&path).unwrap();
        assert_eq!(reopened.list().len(), 2);
        assert_eq!(reopened.get("a"), Some(record("a")));
    }

    #[test]
    fn upsert_replaces_existing_record() {
        let dir = tempfile::tempdir().unwrap();
        let history = MoleHistory::open(&dir.path().join("moles.json")).unwrap();

        history.upsert(record("a")).unwrap();
        let mut updated = record("a");
        updated.image_filename = "a-followup.jpg".into();
        history.upsert(updated.clone()).unwrap();

        assert_eq!(history.list().len(), 1);
        assert_eq!(history.get("a"), Some(updated));
    }

    #[test]
    fn remove_reports_presence() {
        let dir = tempfile::tempdir().unwrap();
        let history = MoleHistory::open(&dir.path().join("moles.json")).unwrap();

        history.upsert(record("a")).unwrap();
        assert!(history.remove("a").unwrap());
        assert!(!history.remove("a").unwrap());
        assert!(history.list().is_empty());
    }
}
