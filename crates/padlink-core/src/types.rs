//! Core domain types

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// How a run should reach the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadMode {
    /// Fresh compile, fresh frame, decorated bootstrap script
    #[default]
    Full,
    /// Delta compile against the cached token, patch delivered to the live frame
    Incremental,
}

impl ReloadMode {
    pub fn is_incremental(&self) -> bool {
        matches!(self, ReloadMode::Incremental)
    }
}

impl std::fmt::Display for ReloadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReloadMode::Full => write!(f, "full"),
            ReloadMode::Incremental => write!(f, "hot reload"),
        }
    }
}

/// Reload orchestrator phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadPhase {
    #[default]
    Idle,
    /// A compile request is in flight
    Compiling,
    /// Compiled output is on its way into the frame
    Delivering,
}

/// Which DDC module system the service compiles for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompilerGeneration {
    /// `ddc_module_loader` + `dartDevEmbedder` (supports hot reload)
    #[default]
    NewDdc,
    /// AMD modules loaded through `dart_sdk` / `dartpad_main`
    Legacy,
}

/// Counter for generating unique log entry IDs
static LOG_ENTRY_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Kind of console output reported by the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Stdout,
    Error,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Stdout => "stdout",
            LogKind::Error => "error",
        }
    }
}

/// A single line of program output
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub kind: LogKind,
    pub message: String,
    /// Unique ID for this entry
    pub id: u64,
}

impl LogEntry {
    pub fn new(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            kind,
            message: message.into(),
            id: LOG_ENTRY_COUNTER.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn stdout(message: impl Into<String>) -> Self {
        Self::new(LogKind::Stdout, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogKind::Error, message)
    }

    pub fn is_error(&self) -> bool {
        self.kind == LogKind::Error
    }

    /// Format the timestamp for display
    pub fn formatted_time(&self) -> String {
        self.timestamp.format("%H:%M:%S%.3f").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_entry_ids_are_unique() {
        let a = LogEntry::stdout("one");
        let b = LogEntry::stdout("two");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_log_entry_kind() {
        assert!(LogEntry::error("boom").is_error());
        assert!(!LogEntry::stdout("hello").is_error());
        assert_eq!(LogKind::Stdout.as_str(), "stdout");
    }

    #[test]
    fn test_reload_mode_display() {
        assert_eq!(ReloadMode::Full.to_string(), "full");
        assert_eq!(ReloadMode::Incremental.to_string(), "hot reload");
        assert!(ReloadMode::Incremental.is_incremental());
    }

    #[test]
    fn test_compiler_generation_deserialize() {
        #[derive(Deserialize)]
        struct Wrap {
            generation: CompilerGeneration,
        }
        let w: Wrap = serde_json::from_str(r#"{"generation":"legacy"}"#).unwrap();
        assert_eq!(w.generation, CompilerGeneration::Legacy);
        let w: Wrap = serde_json::from_str(r#"{"generation":"new_ddc"}"#).unwrap();
        assert_eq!(w.generation, CompilerGeneration::NewDdc);
    }
}
