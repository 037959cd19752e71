//! Append-only durability log replayed on startup.
//!
//! Each line is an independent JSON document:
//! `{"operation":"add"|"delete","payload":<record or id>,"recordedAt":<epoch millis>}`.

use crate::error::MemoryError;
use crate::model::{MemoryRecord, now_millis};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Operation discriminator stored in every log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOperation {
    Add,
    Delete,
}

/// Mutation intent carried by a log entry.
#[derive(Debug, Clone, PartialEq)]
pub enum LogMutation {
    /// Full record to (re)insert.
    Add(MemoryRecord),
    /// Id of the record to remove.
    Delete(String),
}

/// A single replayable log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub mutation: LogMutation,
    /// Time the intent was logged (epoch millis).
    pub recorded_at: i64,
}

impl LogEntry {
    pub fn operation(&self) -> LogOperation {
        match self.mutation {
            LogMutation::Add(_) => LogOperation::Add,
            LogMutation::Delete(_) => LogOperation::Delete,
        }
    }
}

/// Wire form of a log line.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogLine {
    operation: LogOperation,
    payload: serde_json::Value,
    recorded_at: i64,
}

impl LogLine {
    fn from_entry(entry: &LogEntry) -> Result<Self, serde_json::Error> {
        let payload = match &entry.mutation {
            LogMutation::Add(record) => serde_json::to_value(record)?,
            LogMutation::Delete(id) => serde_json::Value::String(id.clone()),
        };
        Ok(Self {
            operation: entry.operation(),
            payload,
            recorded_at: entry.recorded_at,
        })
    }

    fn into_entry(self) -> Result<LogEntry, serde_json::Error> {
        let mutation = match self.operation {
            LogOperation::Add => LogMutation::Add(serde_json::from_value(self.payload)?),
            LogOperation::Delete => LogMutation::Delete(serde_json::from_value(self.payload)?),
        };
        Ok(LogEntry {
            mutation,
            recorded_at: self.recorded_at,
        })
    }
}

/// File-backed durability log.
#[derive(Debug, Clone)]
pub struct DurabilityLog {
    path: PathBuf,
}

impl DurabilityLog {
    /// Open the log at `path`, creating parent directories and an empty file if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(&path)?;
        info!("opened durability log (path={})", path.display());
        Ok(Self { path })
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Log the intent to insert `record`.
    pub fn append_add(&self, record: &MemoryRecord) -> Result<(), MemoryError> {
        self.append(&LogEntry {
            mutation: LogMutation::Add(record.clone()),
            recorded_at: now_millis(),
        })
    }

    /// Log the intent to delete `id`.
    pub fn append_delete(&self, id: &str) -> Result<(), MemoryError> {
        self.append(&LogEntry {
            mutation: LogMutation::Delete(id.to_string()),
            recorded_at: now_millis(),
        })
    }

    /// Read every entry in file order.
    ///
    /// A missing or empty file yields no entries; any unparseable line fails the whole read.
    pub fn read_all(&self) -> Result<Vec<LogEntry>, MemoryError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(MemoryError::Io(err)),
        };
        let reader = BufReader::new(file);
        let mut entries = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry = serde_json::from_str::<LogLine>(&line)
                .and_then(LogLine::into_entry)
                .map_err(|source| MemoryError::MalformedLogEntry {
                    path: self.path.clone(),
                    line: index + 1,
                    source,
                })?;
            entries.push(entry);
        }
        debug!(
            "read durability log (path={}, entries={})",
            self.path.display(),
            entries.len()
        );
        Ok(entries)
    }

    /// Truncate the log. Only call once every entry is reflected in the store.
    pub fn clear(&self) -> Result<(), MemoryError> {
        File::create(&self.path)?.sync_all()?;
        debug!("cleared durability log (path={})", self.path.display());
        Ok(())
    }

    fn append(&self, entry: &LogEntry) -> Result<(), MemoryError> {
        let line = serde_json::to_string(&LogLine::from_entry(entry)?)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        file.sync_data()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{DurabilityLog, LogMutation, LogOperation};
    use crate::error::MemoryError;
    use crate::model::{MemoryCategory, MemoryRecord};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn record(id: &str) -> MemoryRecord {
        MemoryRecord {
            id: id.to_string(),
            content: "test entry".to_string(),
            category: MemoryCategory::Fact,
            tags: Vec::new(),
            timestamp: 1_700_000_000_000,
            importance: 0.5,
            embedding: vec![0.1, 0.2],
            last_accessed: 1_700_000_000_000,
        }
    }

    #[test]
    fn entries_read_back_in_append_order() {
        let temp = tempdir().expect("tempdir");
        let log = DurabilityLog::open(temp.path().join("memory.wal")).expect("log");

        log.append_add(&record("wal-1")).expect("append add");
        log.append_delete("old-id").expect("append delete");

        let entries = log.read_all().expect("read");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].operation(), LogOperation::Add);
        assert_eq!(entries[0].mutation, LogMutation::Add(record("wal-1")));
        assert_eq!(entries[1].operation(), LogOperation::Delete);
        assert_eq!(entries[1].mutation, LogMutation::Delete("old-id".to_string()));

        log.clear().expect("clear");
        assert!(log.read_all().expect("read after clear").is_empty());
    }

    #[test]
    fn open_creates_parent_dirs_and_empty_file() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("dir").join("memory.wal");
        let log = DurabilityLog::open(&path).expect("log");
        assert!(path.exists());
        assert!(log.read_all().expect("read").is_empty());
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("memory.wal");
        let log = DurabilityLog::open(&path).expect("log");
        std::fs::remove_file(&path).expect("remove");
        assert!(log.read_all().expect("read").is_empty());
    }

    #[test]
    fn lines_use_documented_wire_fields() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("memory.wal");
        let log = DurabilityLog::open(&path).expect("log");
        log.append_delete("abc").expect("append");

        let contents = std::fs::read_to_string(&path).expect("read file");
        let value: serde_json::Value =
            serde_json::from_str(contents.trim()).expect("line is json");
        assert_eq!(value["operation"], serde_json::json!("delete"));
        assert_eq!(value["payload"], serde_json::json!("abc"));
        assert!(value["recordedAt"].is_i64());
    }

    #[test]
    fn malformed_line_is_a_fatal_error() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("memory.wal");
        let log = DurabilityLog::open(&path).expect("log");
        log.append_delete("abc").expect("append");
        let mut contents = std::fs::read_to_string(&path).expect("read file");
        contents.push_str("not-json\n");
        std::fs::write(&path, contents).expect("write");

        let err = log.read_all().unwrap_err();
        assert!(matches!(err, MemoryError::MalformedLogEntry { line: 2, .. }));
    }

    #[test]
    fn mismatched_payload_is_rejected() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("memory.wal");
        std::fs::write(
            &path,
            "{\"operation\":\"add\",\"payload\":\"just-an-id\",\"recordedAt\":1}\n",
        )
        .expect("write");
        let log = DurabilityLog::open(&path).expect("log");

        let err = log.read_all().unwrap_err();
        assert!(matches!(err, MemoryError::MalformedLogEntry { line: 1, .. }));
    }
}
