use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{default_config_dir, ConfigError};
use crate::history::{EntryStatus, HistoryEntry};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JournalRecord {
    pub timestamp_unix_ms: i64,
    pub submission: u64,
    pub status: EntryStatus,
    pub query: String,
    pub result: String,
}

impl JournalRecord {
    #[must_use]
    pub fn from_entry(entry: &HistoryEntry) -> Self {
        Self {
            timestamp_unix_ms: chrono::Utc::now().timestamp_millis(),
            submission: entry.id.get(),
            status: entry.status,
            query: entry.query.clone(),
            result: entry.result.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("failed to resolve default config path: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid journal path `{0}`")]
    InvalidPath(PathBuf),
    #[error("failed to create journal directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize journal record: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to append journal record at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct FileHistoryJournal {
    path: PathBuf,
}

impl FileHistoryJournal {
    pub fn load_default() -> Result<Self, JournalError> {
        Ok(Self {
            path: default_config_dir()?.join("history.ndjson"),
        })
    }

    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &JournalRecord) -> Result<(), JournalError> {
        let parent_dir = self
            .path
            .parent()
            .ok_or_else(|| JournalError::InvalidPath(self.path.clone()))?;
        fs::create_dir_all(parent_dir).map_err(|source| JournalError::CreateDir {
            path: parent_dir.to_path_buf(),
            source,
        })?;

        let rendered =
            serde_json::to_string(record).map_err(|source| JournalError::Serialize { source })?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| JournalError::Write {
                path: self.path.clone(),
                source,
            })?;
        writeln!(file, "{rendered}").map_err(|source| JournalError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::{FileHistoryJournal, JournalRecord};
    use crate::history::{EntryStatus, HistoryLog};

    #[test]
    fn appends_resolved_entries_as_json_lines() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = temp_dir.path().join("logs").join("history.ndjson");
        let journal = FileHistoryJournal::from_path(&path);

        let mut log = HistoryLog::new(4);
        let ok = log.begin("list users", "09:00:00");
        log.resolve(ok, EntryStatus::Success, "[]");
        let failed = log.begin("bad", "09:00:01");
        log.resolve(failed, EntryStatus::Error, "Error: boom");

        let records = log.iter().map(JournalRecord::from_entry).collect::<Vec<_>>();
        for record in &records {
            journal.append(record).expect("append should succeed");
        }

        let content = std::fs::read_to_string(path).expect("failed to read journal");
        let loaded = content
            .lines()
            .map(|line| serde_json::from_str::<JournalRecord>(line).expect("invalid line"))
            .collect::<Vec<_>>();
        assert_eq!(loaded, records);
        assert_eq!(loaded[1].status, EntryStatus::Error);
        assert_eq!(loaded[0].submission, 1);
    }
}
