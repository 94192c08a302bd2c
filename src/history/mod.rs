// Thu Oct 15 2026 - Alex

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("History file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("History file {path} line {line}: {source}")]
    Corrupt {
        path: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to encode history record: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub filename: String,
    pub total_functions: usize,
    pub functions_found: usize,
    pub analysis_timestamp: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn new(filename: &str, total_functions: usize, functions_found: usize, analysis_timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.to_string(),
            total_functions,
            functions_found,
            analysis_timestamp,
        }
    }
}

/// Append-only log of completed analyses.
pub trait HistoryStore: Send + Sync {
    fn append(&self, record: AnalysisRecord) -> Result<Uuid, HistoryError>;

    /// All records, newest first.
    fn list(&self) -> Vec<AnalysisRecord>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct MemoryHistory {
    records: RwLock<Vec<AnalysisRecord>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistory {
    fn append(&self, record: AnalysisRecord) -> Result<Uuid, HistoryError> {
        let id = record.id;
        self.records.write().push(record);
        Ok(id)
    }

    fn list(&self) -> Vec<AnalysisRecord> {
        self.records.read().iter().rev().cloned().collect()
    }

    fn len(&self) -> usize {
        self.records.read().len()
    }
}

/// History persisted as one JSON object per line. Existing lines are
/// loaded on open; new records are appended and flushed before they
/// become visible to readers.
pub struct JsonlHistory {
    path: PathBuf,
    file: Mutex<File>,
    records: RwLock<Vec<AnalysisRecord>>,
}

impl JsonlHistory {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, HistoryError> {
        let path = path.as_ref().to_path_buf();
        let io_err = |source| HistoryError::Io {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut records = Vec::new();
        if path.exists() {
            let reader = BufReader::new(File::open(&path).map_err(io_err)?);
            for (index, line) in reader.lines().enumerate() {
                let line = line.map_err(io_err)?;
                if line.trim().is_empty() {
                    continue;
                }
                let record = serde_json::from_str(&line).map_err(|source| HistoryError::Corrupt {
                    path: path.display().to_string(),
                    line: index + 1,
                    source,
                })?;
                records.push(record);
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_err)?;

        log::info!("Opened history {} ({} records)", path.display(), records.len());

        Ok(Self {
            path,
            file: Mutex::new(file),
            records: RwLock::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for JsonlHistory {
    fn append(&self, record: AnalysisRecord) -> Result<Uuid, HistoryError> {
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        // The records lock is taken first and held over the write, so file
        // order and list order are the same.
        let mut records = self.records.write();
        let mut file = self.file.lock();
        file.write_all(line.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|source| HistoryError::Io {
                path: self.path.display().to_string(),
                source,
            })?;

        let id = record.id;
        records.push(record);
        Ok(id)
    }

    fn list(&self) -> Vec<AnalysisRecord> {
        self.records.read().iter().rev().cloned().collect()
    }

    fn len(&self) -> usize {
        self.records.read().len()
    }
}

/// Opens the configured store: a JSONL file when a path is given,
/// otherwise in-memory.
pub fn open_store(path: Option<&Path>) -> Result<Arc<dyn HistoryStore>, HistoryError> {
    match path {
        Some(path) => Ok(Arc::new(JsonlHistory::open(path)?)),
        None => Ok(Arc::new(MemoryHistory::new())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredReport {
    pub record_id: Uuid,
    pub filename: String,
    pub text: String,
}

/// Holds the report of the most recent successful analysis. Each write
/// replaces the previous report whole.
#[derive(Debug, Default)]
pub struct LatestReport {
    slot: RwLock<Option<StoredReport>>,
}

impl LatestReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&self, report: StoredReport) {
        *self.slot.write() = Some(report);
    }

    pub fn get(&self) -> Option<StoredReport> {
        self.slot.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(name: &str, minute: u32) -> AnalysisRecord {
        AnalysisRecord::new(name, 15, 3, Utc.with_ymd_and_hms(2026, 10, 15, 9, minute, 0).unwrap())
    }

    #[test]
    fn test_memory_history_newest_first() {
        let history = MemoryHistory::new();
        assert!(history.is_empty());
        assert!(history.list().is_empty());

        let first = history.append(record("a.node", 1)).unwrap();
        let second = history.append(record("b.node", 2)).unwrap();

        let listed = history.list();
        assert_eq!(history.len(), 2);
        assert_eq!(listed[0].id, second);
        assert_eq!(listed[1].id, first);
    }

    #[test]
    fn test_jsonl_history_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history.jsonl");

        let id = {
            let history = JsonlHistory::open(&path).unwrap();
            history.append(record("a.node", 1)).unwrap();
            history.append(record("b.node", 2)).unwrap()
        };

        let reopened = JsonlHistory::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.list()[0].id, id);
        assert_eq!(reopened.list()[1].filename, "a.node");

        reopened.append(record("c.node", 3)).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 3);
    }

    #[test]
    fn test_jsonl_history_rejects_corrupt_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        std::fs::write(&path, "{not json}\n").unwrap();

        assert!(matches!(
            JsonlHistory::open(&path),
            Err(HistoryError::Corrupt { line: 1, .. })
        ));
    }

    #[test]
    fn test_jsonl_concurrent_appends_keep_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        let history = Arc::new(JsonlHistory::open(&path).unwrap());

        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let history = history.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        history.append(record(&format!("{}-{}.node", worker, i), 1)).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let in_file: Vec<Uuid> = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str::<AnalysisRecord>(line).unwrap().id)
            .collect();
        let mut listed: Vec<Uuid> = history.list().into_iter().map(|r| r.id).collect();
        listed.reverse();

        assert_eq!(in_file.len(), 200);
        assert_eq!(in_file, listed);
    }

    #[test]
    fn test_latest_report_replaces() {
        let latest = LatestReport::new();
        assert!(latest.get().is_none());

        let first = StoredReport { record_id: Uuid::new_v4(), filename: "a.node".into(), text: "one".into() };
        let second = StoredReport { record_id: Uuid::new_v4(), filename: "b.node".into(), text: "two".into() };
        latest.replace(first);
        latest.replace(second.clone());
        assert_eq!(latest.get(), Some(second));
    }

    #[test]
    fn test_open_store_defaults_to_memory() {
        let store = open_store(None).unwrap();
        store.append(record("a.node", 1)).unwrap();
        assert_eq!(store.len(), 1);
    }
}
