//! Durable snapshots of verification results
//!
//! A checkpoint is a JSON object mapping each item path to a record:
//!
//! ```text
//! { "/videos/a.mp4": [true, null, 1048576],
//!   "/videos/b.mp4": [false, "moov atom not found", 2048] }
//! ```
//!
//! Older files stored two-field records (`[valid, message]`); those are still
//! accepted and load with a size of 0. New checkpoints are always written in
//! the three-field shape.
//!
//! Saves rewrite the whole map through a temp file and a rename, so a reader
//! never observes a half-written checkpoint.

use super::types::{Outcome, ResultMap, WorkItem};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("failed to read checkpoint {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("checkpoint {} is malformed: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize checkpoint: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write checkpoint {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Destination for result snapshots
pub trait CheckpointSink: Send + Sync {
    /// Overwrite the stored state with `results`
    fn save(&self, results: &ResultMap) -> Result<(), CheckpointError>;

    /// Where the state lives, for operator messages
    fn location(&self) -> &Path;
}

/// On-disk record, newest shape first so the decoder prefers it
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredRecord {
    Current(bool, Option<String>, u64),
    Legacy(bool, Option<String>),
}

impl From<StoredRecord> for Outcome {
    fn from(record: StoredRecord) -> Self {
        match record {
            StoredRecord::Current(valid, message, size) => Outcome::from_parts(valid, message, size),
            StoredRecord::Legacy(valid, message) => Outcome::from_parts(valid, message, 0),
        }
    }
}

impl From<&Outcome> for StoredRecord {
    fn from(outcome: &Outcome) -> Self {
        StoredRecord::Current(outcome.valid, outcome.message.clone(), outcome.size)
    }
}

/// Decode checkpoint JSON into a result map
fn decode(content: &str) -> Result<ResultMap, serde_json::Error> {
    let records: BTreeMap<String, StoredRecord> = serde_json::from_str(content)?;
    Ok(records
        .into_iter()
        .map(|(path, record)| (PathBuf::from(path), Outcome::from(record)))
        .collect())
}

/// Encode a result map as checkpoint JSON (always the current record shape)
fn encode(results: &ResultMap) -> Result<String, serde_json::Error> {
    let records: BTreeMap<String, StoredRecord> = results
        .iter()
        .map(|(path, outcome)| (path.to_string_lossy().into_owned(), StoredRecord::from(outcome)))
        .collect();
    serde_json::to_string(&records)
}

/// Checkpoint file on the local filesystem
pub struct JsonCheckpointStore {
    path: PathBuf,
    /// Serializes saves within this process so flushes never share the temp file
    write_lock: Mutex<()>,
}

impl JsonCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load previously saved results; a missing file means no prior state
    pub fn load(&self) -> Result<ResultMap, CheckpointError> {
        if !self.path.exists() {
            tracing::debug!("No checkpoint at {}", self.path.display());
            return Ok(ResultMap::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|source| CheckpointError::Read {
            path: self.path.clone(),
            source,
        })?;

        let results = decode(&content).map_err(|source| CheckpointError::Malformed {
            path: self.path.clone(),
            source,
        })?;

        tracing::info!(
            "Loaded checkpoint {} with {} entries",
            self.path.display(),
            results.len()
        );
        Ok(results)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "checkpoint".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CheckpointSink for JsonCheckpointStore {
    fn save(&self, results: &ResultMap) -> Result<(), CheckpointError> {
        let json = encode(results)?;
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| CheckpointError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let temp_path = self.temp_path();
        fs::write(&temp_path, json).map_err(|source| CheckpointError::Write {
            path: temp_path.clone(),
            source,
        })?;

        // Atomic rename
        fs::rename(&temp_path, &self.path).map_err(|source| CheckpointError::Write {
            path: self.path.clone(),
            source,
        })?;

        tracing::debug!(
            "Saved checkpoint {} with {} entries",
            self.path.display(),
            results.len()
        );
        Ok(())
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

/// Items not yet recorded in `done`, in their original order
pub fn pending_items(items: Vec<WorkItem>, done: &ResultMap) -> Vec<WorkItem> {
    items
        .into_iter()
        .filter(|item| !done.contains_key(item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_results() -> ResultMap {
        let mut results = ResultMap::new();
        results.insert(PathBuf::from("/videos/a.mp4"), Outcome::valid(1024));
        results.insert(
            PathBuf::from("/videos/course/b.mp4"),
            Outcome::invalid("moov atom not found", 2048),
        );
        results
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonCheckpointStore::new(dir.path().join("absent.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = JsonCheckpointStore::new(dir.path().join("checkpoint.json"));
        let results = sample_results();

        store.save(&results).unwrap();
        assert_eq!(store.load().unwrap(), results);
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_writes_three_field_records() {
        let dir = TempDir::new().unwrap();
        let store = JsonCheckpointStore::new(dir.path().join("checkpoint.json"));
        store.save(&sample_results()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["/videos/a.mp4"], serde_json::json!([true, null, 1024]));
        assert_eq!(
            raw["/videos/course/b.mp4"],
            serde_json::json!([false, "moov atom not found", 2048])
        );
    }

    #[test]
    fn test_legacy_two_field_records_default_size() {
        let results = decode(r#"{"/v/a.mp4": [true, null], "/v/b.mp4": [false, "broken"]}"#).unwrap();
        assert_eq!(results[Path::new("/v/a.mp4")], Outcome::valid(0));
        assert_eq!(results[Path::new("/v/b.mp4")], Outcome::invalid("broken", 0));
    }

    #[test]
    fn test_mixed_record_shapes() {
        let results = decode(r#"{"/v/a.mp4": [true, null], "/v/b.mp4": [false, "broken", 77]}"#).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[Path::new("/v/b.mp4")].size, 77);
    }

    #[test]
    fn test_malformed_checkpoint_fails_fast() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("checkpoint.json");
        fs::write(&path, "{not json").unwrap();

        let store = JsonCheckpointStore::new(&path);
        assert!(matches!(store.load(), Err(CheckpointError::Malformed { .. })));

        fs::write(&path, r#"{"/v/a.mp4": "yes"}"#).unwrap();
        assert!(matches!(store.load(), Err(CheckpointError::Malformed { .. })));
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = JsonCheckpointStore::new(dir.path().join("state/nested/checkpoint.json"));
        store.save(&sample_results()).unwrap();
        assert_eq!(store.load().unwrap().len(), 2);
    }

    #[test]
    fn test_repeated_saves_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = JsonCheckpointStore::new(dir.path().join("checkpoint.json"));
        let mut results = sample_results();
        store.save(&results).unwrap();

        results.insert(PathBuf::from("/videos/c.mp4"), Outcome::valid(5));
        store.save(&results).unwrap();
        store.save(&results).unwrap();

        assert_eq!(store.load().unwrap(), results);
    }

    #[test]
    fn test_pending_items_skips_recorded() {
        let done = sample_results();
        let items = vec![
            PathBuf::from("/videos/a.mp4"),
            PathBuf::from("/videos/new.mp4"),
            PathBuf::from("/videos/course/b.mp4"),
            PathBuf::from("/videos/other.mp4"),
        ];

        let pending = pending_items(items, &done);
        assert_eq!(
            pending,
            vec![PathBuf::from("/videos/new.mp4"), PathBuf::from("/videos/other.mp4")]
        );
    }
}
