//! Application state (Model in TEA pattern)

use std::path::PathBuf;

use padlink_core::{
    AiRequest, AnalysisResult, AppType, LogEntry, ReloadMode, ReloadPhase, VersionInfo,
};

use crate::config::Settings;
use crate::console::LogBuffer;
use crate::orchestrator::RunOutcome;

/// AI code generation state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AiState {
    #[default]
    Idle,
    /// A generate/update request is in flight
    Pending { request: AiRequest },
    /// The last request failed; it is kept so it can be retried as-is
    Failed { reason: String, request: AiRequest },
}

impl AiState {
    pub fn is_pending(&self) -> bool {
        matches!(self, AiState::Pending { .. })
    }

    /// Request that produced the current state, if any
    pub fn request(&self) -> Option<&AiRequest> {
        match self {
            AiState::Idle => None,
            AiState::Pending { request } | AiState::Failed { request, .. } => Some(request),
        }
    }
}

/// Complete application state (the Model in TEA)
#[derive(Debug)]
pub struct AppState {
    /// Current Dart source
    pub source: String,

    /// File the source is mirrored to, when editing from disk
    pub source_path: Option<PathBuf>,

    /// Cursor offset into `source`; remapped by formatting
    pub cursor_offset: usize,

    pub settings: Settings,

    /// Mirrors the orchestrator's phase
    pub reload_phase: ReloadPhase,

    /// Whether the last compile left a usable incremental token
    pub hot_reload_available: bool,

    /// Source the last delivered run was compiled from
    pub last_compiled_source: Option<String>,

    pub last_run: Option<RunOutcome>,
    pub last_run_mode: ReloadMode,

    /// Number of runs that have finished (any outcome)
    pub run_count: u64,

    pub analysis: Option<AnalysisResult>,
    pub is_analyzing: bool,

    /// Bumped whenever a fresh analysis result is stored
    pub analysis_revision: u64,

    /// Bumped on every edit; analysis results for older generations are dropped
    pub analysis_generation: u64,

    pub is_formatting: bool,

    /// Frame console output
    pub logs: LogBuffer,

    pub ai: AiState,

    pub version: Option<VersionInfo>,

    /// Last failed service call, as `(operation, reason)`
    pub last_service_error: Option<(String, String)>,

    /// Number of failed service calls so far
    pub service_error_count: u64,

    /// Bumped whenever `source` is replaced by something other than the user
    pub source_revision: u64,

    quitting: bool,
}

impl AppState {
    pub fn new(source: String, settings: Settings) -> Self {
        Self {
            cursor_offset: 0,
            source,
            source_path: None,
            settings,
            reload_phase: ReloadPhase::Idle,
            hot_reload_available: false,
            last_compiled_source: None,
            last_run: None,
            last_run_mode: ReloadMode::Full,
            run_count: 0,
            analysis: None,
            is_analyzing: false,
            analysis_revision: 0,
            analysis_generation: 0,
            is_formatting: false,
            logs: LogBuffer::new(),
            ai: AiState::Idle,
            version: None,
            last_service_error: None,
            service_error_count: 0,
            source_revision: 0,
            quitting: false,
        }
    }

    pub fn with_source_path(mut self, path: PathBuf) -> Self {
        self.source_path = Some(path);
        self
    }

    /// App type sent with AI requests
    pub fn app_type(&self) -> AppType {
        if self.settings.compiler.flutter {
            AppType::Flutter
        } else {
            AppType::Dart
        }
    }

    /// Hot reload is offered only with a token and an edit since the last compile
    pub fn can_hot_reload(&self) -> bool {
        self.hot_reload_available && self.last_compiled_source.as_deref() != Some(&self.source)
    }

    pub fn is_running(&self) -> bool {
        self.reload_phase != ReloadPhase::Idle
    }

    /// Replace the source, keeping the cursor inside it
    pub fn set_source(&mut self, source: String) {
        self.cursor_offset = self.cursor_offset.min(source.len());
        self.source = source;
    }

    pub fn record_service_error(&mut self, operation: &str, reason: impl Into<String>) {
        self.last_service_error = Some((operation.to_string(), reason.into()));
        self.service_error_count += 1;
    }

    pub fn add_log(&mut self, entry: LogEntry) {
        self.logs.push(entry);
    }

    pub fn request_quit(&mut self) {
        self.quitting = true;
    }

    /// Check if the app should quit
    pub fn should_quit(&self) -> bool {
        self.quitting
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(source: &str) -> AppState {
        AppState::new(source.to_string(), Settings::default())
    }

    #[test]
    fn test_new_state() {
        let state = state("void main() {}");
        assert_eq!(state.reload_phase, ReloadPhase::Idle);
        assert!(!state.can_hot_reload());
        assert!(state.logs.is_empty());
        assert!(!state.should_quit());
        assert_eq!(state.app_type(), AppType::Flutter);
    }

    #[test]
    fn test_can_hot_reload_requires_edit() {
        let mut state = state("v1");
        state.hot_reload_available = true;
        state.last_compiled_source = Some("v1".to_string());
        assert!(!state.can_hot_reload());

        state.set_source("v2".to_string());
        assert!(state.can_hot_reload());
    }

    #[test]
    fn test_set_source_clamps_cursor() {
        let mut state = state("a long program");
        state.cursor_offset = 10;
        state.set_source("short".to_string());
        assert_eq!(state.cursor_offset, 5);
    }

    #[test]
    fn test_ai_state_request() {
        let request = AiRequest::generate(AppType::Dart, "hello");
        let failed = AiState::Failed {
            reason: "429".to_string(),
            request: request.clone(),
        };
        assert_eq!(failed.request(), Some(&request));
        assert!(!failed.is_pending());
        assert_eq!(AiState::Idle.request(), None);
    }
}
