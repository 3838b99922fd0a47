//! Bounded in-memory record of commits made by this process.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Maximum number of records kept; older records are evicted first.
pub const LEDGER_CAPACITY: usize = 100;

/// Default number of records returned to a history viewer.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// A commit this process created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub files: Vec<String>,
}

impl CommitRecord {
    /// First line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

/// Newest-first commit history, bounded at a fixed capacity.
///
/// Appends take a lock for the whole insert-and-evict step, so concurrent
/// appends never leave the ledger over capacity or half-written.
#[derive(Debug)]
pub struct CommitLedger {
    records: Mutex<VecDeque<CommitRecord>>,
    capacity: usize,
}

impl Default for CommitLedger {
    fn default() -> Self {
        Self::with_capacity(LEDGER_CAPACITY)
    }
}

impl CommitLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Record a commit made now. Returns the stored record.
    pub fn append(&self, message: impl Into<String>, files: Vec<String>) -> CommitRecord {
        let record = CommitRecord {
            timestamp: Utc::now(),
            message: message.into(),
            files,
        };

        let mut records = self.records.lock();
        records.push_front(record.clone());
        records.truncate(self.capacity);

        record
    }

    /// Up to `limit` records, newest first.
    pub fn recent(&self, limit: usize) -> Vec<CommitRecord> {
        self.records.lock().iter().take(limit).cloned().collect()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
