//! Headless mode - NDJSON event output
//!
//! padlink has no editor UI of its own. It compiles and delivers the watched
//! file and reports everything that happens as structured JSON on stdout,
//! so other tools (editor plugins, test scripts) can drive it.
//!
//! # Event Format
//!
//! Events are output as NDJSON (newline-delimited JSON), one event per line.
//! Each event has an "event" field indicating its type, along with event-specific data.
//!
//! # Example Output
//!
//! ```json
//! {"event":"phase_changed","phase":"compiling","timestamp":1704700001000}
//! {"event":"frame_attached","frame":"frame-1","dir":"out/frame-1","timestamp":1704700001200}
//! {"event":"run_completed","mode":"full","result":"delivered","command":"execute","posted":true,"hot_reload_available":true,"timestamp":1704700002000}
//! {"event":"log","level":"stdout","message":"Hello","timestamp":1704700003000}
//! ```

pub mod frame_dir;
pub mod runner;

use chrono::Utc;
use serde::Serialize;
use std::io::{self, Write};
use tracing::error;

use padlink_app::{EngineEvent, RunOutcome};
use padlink_core::{ReloadMode, ReloadPhase};

/// Events emitted in headless mode
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    /// Reload orchestrator moved to a new phase
    PhaseChanged { phase: ReloadPhase, timestamp: i64 },

    /// A fresh frame was created for a full run
    FrameAttached {
        frame: String,
        dir: String,
        timestamp: i64,
    },

    /// A run finished
    RunCompleted {
        mode: ReloadMode,
        result: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        frame: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        command: Option<&'static str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        posted: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
        hot_reload_available: bool,
        timestamp: i64,
    },

    /// Output relayed from the frame
    Log {
        level: String,
        message: String,
        timestamp: i64,
    },

    LogsCleared { timestamp: i64 },

    Analysis {
        errors: usize,
        warnings: usize,
        timestamp: i64,
    },

    /// Source replaced by the formatter or AI generation (already written back to disk)
    SourceReplaced { revision: u64, timestamp: i64 },

    AiPending { prompt: String, timestamp: i64 },

    AiFailed { reason: String, timestamp: i64 },

    Version {
        dart_version: String,
        flutter_version: String,
        timestamp: i64,
    },

    /// Error occurred
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        operation: Option<String>,
        fatal: bool,
        timestamp: i64,
    },

    Shutdown { timestamp: i64 },
}

impl HeadlessEvent {
    /// Emit this event to stdout as JSON
    pub fn emit(&self) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize headless event: {}", e);
                return;
            }
        };

        // Write to stdout with newline (NDJSON format)
        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", json) {
            error!("Failed to write headless event to stdout: {}", e);
            return;
        }

        if let Err(e) = stdout.flush() {
            error!("Failed to flush headless stdout: {}", e);
        }
    }

    /// Get current timestamp in milliseconds
    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    pub fn frame_attached(frame: &str, dir: &str) -> Self {
        Self::FrameAttached {
            frame: frame.to_string(),
            dir: dir.to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn error(message: String, fatal: bool) -> Self {
        Self::Error {
            message,
            operation: None,
            fatal,
            timestamp: Self::now(),
        }
    }

    fn run_completed(mode: ReloadMode, outcome: RunOutcome, hot_reload_available: bool) -> Self {
        let (result, frame, command, posted, reason, status) = match outcome {
            RunOutcome::Delivered {
                frame,
                command,
                posted,
                ..
            } => (
                "delivered",
                frame.map(|id| id.to_string()),
                Some(command),
                Some(posted),
                None,
                None,
            ),
            RunOutcome::NothingToDo => ("nothing_to_do", None, None, None, None, None),
            RunOutcome::Refused => ("refused", None, None, None, None, None),
            RunOutcome::Superseded => ("superseded", None, None, None, None, None),
            RunOutcome::Failed { reason, status } => {
                ("failed", None, None, None, Some(reason), status)
            }
        };
        Self::RunCompleted {
            mode,
            result,
            frame,
            command,
            posted,
            reason,
            status,
            hot_reload_available,
            timestamp: Self::now(),
        }
    }
}

impl From<EngineEvent> for HeadlessEvent {
    fn from(event: EngineEvent) -> Self {
        let timestamp = Self::now();
        match event {
            EngineEvent::PhaseChanged { new_phase, .. } => Self::PhaseChanged {
                phase: new_phase,
                timestamp,
            },
            EngineEvent::RunCompleted {
                mode,
                outcome,
                hot_reload_available,
            } => Self::run_completed(mode, outcome, hot_reload_available),
            EngineEvent::Log { entry } => Self::Log {
                level: entry.kind.as_str().to_string(),
                message: entry.message,
                timestamp,
            },
            EngineEvent::LogsCleared => Self::LogsCleared { timestamp },
            EngineEvent::AnalysisUpdated { errors, warnings } => Self::Analysis {
                errors,
                warnings,
                timestamp,
            },
            EngineEvent::SourceReplaced { revision, .. } => {
                Self::SourceReplaced { revision, timestamp }
            }
            EngineEvent::AiPending { prompt } => Self::AiPending { prompt, timestamp },
            EngineEvent::AiFailed { reason } => Self::AiFailed { reason, timestamp },
            EngineEvent::VersionReceived { version } => Self::Version {
                dart_version: version.dart_version,
                flutter_version: version.flutter_version,
                timestamp,
            },
            EngineEvent::ServiceError { operation, reason } => Self::Error {
                message: reason,
                operation: Some(operation),
                fatal: false,
                timestamp,
            },
            EngineEvent::Shutdown => Self::Shutdown { timestamp },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use padlink_core::LogEntry;

    fn to_json(event: HeadlessEvent) -> serde_json::Value {
        serde_json::to_value(event).unwrap()
    }

    #[test]
    fn test_phase_changed_serialization() {
        let json = to_json(HeadlessEvent::from(EngineEvent::PhaseChanged {
            old_phase: ReloadPhase::Idle,
            new_phase: ReloadPhase::Compiling,
        }));

        assert_eq!(json["event"], "phase_changed");
        assert_eq!(json["phase"], "compiling");
        assert!(json["timestamp"].is_i64());
    }

    #[test]
    fn test_delivered_run_serialization() {
        let json = to_json(HeadlessEvent::from(EngineEvent::RunCompleted {
            mode: ReloadMode::Incremental,
            outcome: RunOutcome::Delivered {
                mode: ReloadMode::Incremental,
                frame: None,
                command: "executeReload",
                posted: true,
            },
            hot_reload_available: true,
        }));

        assert_eq!(json["event"], "run_completed");
        assert_eq!(json["mode"], "incremental");
        assert_eq!(json["result"], "delivered");
        assert_eq!(json["command"], "executeReload");
        assert_eq!(json["posted"], true);
        assert!(json.get("reason").is_none());
        assert!(json.get("frame").is_none());
    }

    #[test]
    fn test_failed_run_carries_status() {
        let json = to_json(HeadlessEvent::from(EngineEvent::RunCompleted {
            mode: ReloadMode::Full,
            outcome: RunOutcome::Failed {
                reason: "compileNewDDC request failed: 500 Internal Server Error".to_string(),
                status: Some(500),
            },
            hot_reload_available: false,
        }));

        assert_eq!(json["result"], "failed");
        assert_eq!(json["status"], 500);
        assert!(json.get("command").is_none());
    }

    #[test]
    fn test_log_serialization() {
        let json = to_json(HeadlessEvent::from(EngineEvent::Log {
            entry: LogEntry::error("Uncaught TypeError"),
        }));

        assert_eq!(json["event"], "log");
        assert_eq!(json["level"], "error");
        assert_eq!(json["message"], "Uncaught TypeError");
    }

    #[test]
    fn test_service_error_serialization() {
        let json = to_json(HeadlessEvent::from(EngineEvent::ServiceError {
            operation: "format".to_string(),
            reason: "429 Too Many Requests".to_string(),
        }));

        assert_eq!(json["event"], "error");
        assert_eq!(json["operation"], "format");
        assert_eq!(json["fatal"], false);
    }

    #[test]
    fn test_frame_attached_serialization() {
        let json = to_json(HeadlessEvent::frame_attached("frame-2", "out/frame-2"));
        assert_eq!(json["event"], "frame_attached");
        assert_eq!(json["frame"], "frame-2");
        assert_eq!(json["dir"], "out/frame-2");
    }
}
