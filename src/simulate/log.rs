//! Capped, newest-first security console log.

use std::collections::VecDeque;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Console capacity used when none is configured.
pub const DEFAULT_LOG_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSeverity {
    Success,
    Warning,
    Error,
}

/// One line in the security console.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub severity: LogSeverity,
    pub message: String,
    /// Wall-clock label shown next to the message (`HH:MM:SS`).
    pub timestamp: String,
    pub recorded_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(severity: LogSeverity, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            severity,
            message: message.into(),
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            recorded_at: Utc::now(),
        }
    }
}

pub struct SecurityLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl SecurityLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a message at the front, dropping the oldest past capacity.
    pub fn push(&mut self, severity: LogSeverity, message: impl Into<String>) -> LogEntry {
        let entry = LogEntry::new(severity, message);
        self.entries.push_front(entry.clone());
        self.entries.truncate(self.capacity);
        entry
    }

    /// Newest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for SecurityLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}
