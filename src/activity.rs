//! Bounded in-process activity log exposed to admins at `GET /admin/logs`.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub timestamp: String,
    pub level: Level,
    pub message: String,
}

/// Ring buffer of recent relay outcomes. Oldest entries are dropped first.
pub struct ActivityLog {
    capacity: usize,
    entries: Mutex<VecDeque<ActivityEntry>>,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn record(&self, level: Level, message: impl Into<String>) {
        let entry = ActivityEntry {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level,
            message: message.into(),
        };
        // A poisoned lock only means another writer panicked mid-push; the deque is still usable.
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.record(Level::Info, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.record(Level::Error, message);
    }

    /// Oldest-first copy of the current entries.
    pub fn snapshot(&self) -> Vec<ActivityEntry> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().cloned().collect()
    }
}
