//! Program output relayed from the frame

use padlink_core::{LogEntry, LogKind};

/// Append-only console; entries only disappear through [`LogBuffer::clear`]
#[derive(Debug, Default, Clone)]
pub struct LogBuffer {
    entries: Vec<LogEntry>,
    error_count: usize,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: LogEntry) {
        if entry.kind == LogKind::Error {
            self.error_count += 1;
        }
        self.entries.push(entry);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.error_count = 0;
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Entries appended after the first `seen`
    pub fn since(&self, seen: usize) -> &[LogEntry] {
        self.entries.get(seen..).unwrap_or_default()
    }
}
