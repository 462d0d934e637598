//! Message types for the application (TEA pattern)

use padlink_core::{AnalysisResult, FormatResult, LogEntry, ReloadMode, ReloadPhase, VersionInfo};

use crate::orchestrator::RunOutcome;

/// All possible messages/actions in the application
#[derive(Debug, Clone)]
pub enum Message {
    // ─────────────────────────────────────────────────────────
    // Source
    // ─────────────────────────────────────────────────────────
    /// The user edited the source
    SourceEdited { source: String },

    /// The source file changed on disk
    SourceFileChanged { source: String },

    /// Move the cursor (offset into the source)
    CursorMoved { offset: usize },

    // ─────────────────────────────────────────────────────────
    // Compile & Run
    // ─────────────────────────────────────────────────────────
    /// Fresh compile and fresh frame
    Run,
    /// Incremental compile delivered to the live frame
    HotReload,
    /// A run finished; carries the compile client's token status afterwards
    RunFinished {
        mode: ReloadMode,
        source: String,
        outcome: RunOutcome,
        hot_reload_available: bool,
    },
    /// The orchestrator moved to a new phase
    ReloadPhaseChanged(ReloadPhase),

    // ─────────────────────────────────────────────────────────
    // Frame Console
    // ─────────────────────────────────────────────────────────
    /// Output relayed from the frame
    FrameLog(LogEntry),
    ClearLogs,

    // ─────────────────────────────────────────────────────────
    // Analysis & Formatting
    // ─────────────────────────────────────────────────────────
    /// Debounce window for `generation` elapsed
    AnalysisDue { generation: u64 },
    /// Analyze the current source without waiting for the debounce
    AnalyzeNow,
    AnalysisCompleted {
        generation: u64,
        result: Result<AnalysisResult, String>,
    },
    Format,
    FormatCompleted {
        /// Source the formatter was given; stale results are dropped
        original: String,
        result: Result<FormatResult, String>,
    },

    // ─────────────────────────────────────────────────────────
    // Service Info
    // ─────────────────────────────────────────────────────────
    RequestVersion,
    VersionReceived(Result<VersionInfo, String>),

    // ─────────────────────────────────────────────────────────
    // AI Code Generation
    // ─────────────────────────────────────────────────────────
    /// Generate a new program from a prompt
    GenerateCode { prompt: String },
    /// Rewrite the current program according to a prompt
    UpdateCode { prompt: String },
    AiCompleted(Result<String, String>),
    /// Resubmit the request that failed
    RetryAi,
    /// Close the AI error
    DismissAi,

    // ─────────────────────────────────────────────────────────
    // File Watcher
    // ─────────────────────────────────────────────────────────
    WatcherError { message: String },

    /// Request to quit
    Quit,
}
