use std::collections::VecDeque;
use std::fmt;

use chrono::Local;
use serde::{Deserialize, Serialize};

pub const PENDING_RESULT_TEXT: &str = "Executing query...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(u64);

impl SubmissionId {
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Pending,
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: SubmissionId,
    pub timestamp: String,
    pub query: String,
    pub result: String,
    pub status: EntryStatus,
}

#[must_use]
pub fn local_timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

#[derive(Debug, Clone)]
pub struct HistoryLog {
    capacity: usize,
    entries: VecDeque<HistoryEntry>,
    next_id: u64,
    total_submitted: u64,
}

impl HistoryLog {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be greater than 0");
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity.min(64)),
            next_id: 1,
            total_submitted: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn total_submitted(&self) -> u64 {
        self.total_submitted
    }

    pub fn begin(&mut self, query: impl Into<String>, timestamp: impl Into<String>) -> SubmissionId {
        let id = SubmissionId(self.next_id);
        self.next_id += 1;
        self.total_submitted += 1;

        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry {
            id,
            timestamp: timestamp.into(),
            query: query.into(),
            result: PENDING_RESULT_TEXT.to_string(),
            status: EntryStatus::Pending,
        });
        id
    }

    /// Replaces the result of the entry with `id`. Returns `false` when the
    /// entry is gone (evicted) or was never issued.
    pub fn resolve(&mut self, id: SubmissionId, status: EntryStatus, result: impl Into<String>) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) else {
            return false;
        };
        entry.status = status;
        entry.result = result.into();
        true
    }

    #[must_use]
    pub fn get(&self, id: SubmissionId) -> Option<&HistoryEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    #[must_use]
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn visible_entries(&self, start: usize, limit: usize) -> Vec<&HistoryEntry> {
        if limit == 0 || start >= self.entries.len() {
            return Vec::new();
        }
        self.entries.iter().skip(start).take(limit).collect()
    }
}
