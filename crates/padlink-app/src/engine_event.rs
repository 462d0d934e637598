//! Domain events emitted by the Engine for external consumers
//!
//! Events are broadcast after each message processing cycle via
//! `Engine::subscribe()`. The headless runner turns them into NDJSON.

use padlink_core::{LogEntry, ReloadMode, ReloadPhase, VersionInfo};

use crate::orchestrator::RunOutcome;

/// Domain events emitted by the Engine.
///
/// Events are derived by diffing state before and after each message, so
/// subscribers see a consistent view of state changes.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    // ─────────────────────────────────────────────────────────
    // Compile & Run
    // ─────────────────────────────────────────────────────────
    /// The reload orchestrator moved to a new phase
    PhaseChanged {
        old_phase: ReloadPhase,
        new_phase: ReloadPhase,
    },

    /// A run finished, whatever the outcome
    RunCompleted {
        mode: ReloadMode,
        outcome: RunOutcome,
        hot_reload_available: bool,
    },

    // ─────────────────────────────────────────────────────────
    // Frame Console
    // ─────────────────────────────────────────────────────────
    /// Output relayed from the frame
    Log { entry: LogEntry },

    LogsCleared,

    // ─────────────────────────────────────────────────────────
    // Source & Analysis
    // ─────────────────────────────────────────────────────────
    /// Fresh analysis result stored
    AnalysisUpdated { errors: usize, warnings: usize },

    /// Source replaced by the formatter or the AI endpoints
    SourceReplaced { revision: u64, source: String },

    // ─────────────────────────────────────────────────────────
    // AI Code Generation
    // ─────────────────────────────────────────────────────────
    AiPending { prompt: String },

    /// The AI request failed and can be retried
    AiFailed { reason: String },

    // ─────────────────────────────────────────────────────────
    // Service
    // ─────────────────────────────────────────────────────────
    VersionReceived { version: VersionInfo },

    /// A service call failed
    ServiceError { operation: String, reason: String },

    // ─────────────────────────────────────────────────────────
    // Engine Lifecycle
    // ─────────────────────────────────────────────────────────
    /// Engine is shutting down
    Shutdown,
}

impl EngineEvent {
    /// Returns a short string label for this event type (for logging/debugging).
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PhaseChanged { .. } => "phase_changed",
            Self::RunCompleted { .. } => "run_completed",
            Self::Log { .. } => "log",
            Self::LogsCleared => "logs_cleared",
            Self::AnalysisUpdated { .. } => "analysis_updated",
            Self::SourceReplaced { .. } => "source_replaced",
            Self::AiPending { .. } => "ai_pending",
            Self::AiFailed { .. } => "ai_failed",
            Self::VersionReceived { .. } => "version_received",
            Self::ServiceError { .. } => "service_error",
            Self::Shutdown => "shutdown",
        }
    }
}
