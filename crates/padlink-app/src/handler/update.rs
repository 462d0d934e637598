//! Main update function - handles state transitions (TEA pattern)

use padlink_core::{AiRequest, ReloadMode};
use tracing::{debug, warn};

use crate::message::Message;
use crate::orchestrator::RunOutcome;
use crate::state::{AiState, AppState};

use super::{UpdateAction, UpdateResult};

/// Process a message and update state
/// Returns optional follow-up message and/or action
pub fn update(state: &mut AppState, message: Message) -> UpdateResult {
    match message {
        Message::Quit => {
            state.request_quit();
            UpdateResult::none()
        }

        // ─────────────────────────────────────────────────────────
        // Source
        // ─────────────────────────────────────────────────────────
        Message::SourceEdited { source } => {
            state.set_source(source);
            schedule_analysis(state)
        }

        Message::SourceFileChanged { source } => {
            if source == state.source {
                return UpdateResult::none();
            }
            state.set_source(source);
            let result = schedule_analysis(state);

            // Only a program that has run before is reloaded automatically
            if state.settings.watcher.auto_reload && state.last_compiled_source.is_some() {
                let follow_up = if state.can_hot_reload() {
                    Message::HotReload
                } else {
                    Message::Run
                };
                result.with_message(follow_up)
            } else {
                result
            }
        }

        Message::CursorMoved { offset } => {
            state.cursor_offset = offset.min(state.source.len());
            UpdateResult::none()
        }

        // ─────────────────────────────────────────────────────────
        // Compile & Run
        // ─────────────────────────────────────────────────────────
        Message::Run => UpdateResult::action(UpdateAction::RunCycle {
            source: state.source.clone(),
            mode: ReloadMode::Full,
        }),

        Message::HotReload => UpdateResult::action(UpdateAction::RunCycle {
            source: state.source.clone(),
            mode: ReloadMode::Incremental,
        }),

        Message::RunFinished {
            mode,
            source,
            outcome,
            hot_reload_available,
        } => {
            state.hot_reload_available = hot_reload_available;
            state.run_count += 1;
            state.last_run_mode = mode;
            match &outcome {
                RunOutcome::Delivered { .. } => {
                    state.last_compiled_source = Some(source);
                }
                RunOutcome::Failed { reason, .. } => {
                    state.record_service_error("compile", reason.clone());
                }
                RunOutcome::Refused => debug!("{} refused", mode),
                RunOutcome::NothingToDo | RunOutcome::Superseded => {}
            }
            state.last_run = Some(outcome);
            UpdateResult::none()
        }

        Message::ReloadPhaseChanged(phase) => {
            state.reload_phase = phase;
            UpdateResult::none()
        }

        // ─────────────────────────────────────────────────────────
        // Frame Console
        // ─────────────────────────────────────────────────────────
        Message::FrameLog(entry) => {
            state.add_log(entry);
            UpdateResult::none()
        }

        Message::ClearLogs => {
            state.logs.clear();
            UpdateResult::none()
        }

        // ─────────────────────────────────────────────────────────
        // Analysis & Formatting
        // ─────────────────────────────────────────────────────────
        Message::AnalysisDue { generation } => {
            if generation != state.analysis_generation {
                return UpdateResult::none();
            }
            start_analysis(state)
        }

        Message::AnalyzeNow => {
            state.analysis_generation += 1;
            start_analysis(state)
        }

        Message::AnalysisCompleted { generation, result } => {
            if generation != state.analysis_generation {
                debug!("Dropping analysis for stale generation {}", generation);
                return UpdateResult::none();
            }
            state.is_analyzing = false;
            match result {
                Ok(analysis) => {
                    state.analysis = Some(analysis);
                    state.analysis_revision += 1;
                }
                Err(reason) => {
                    warn!("Analysis failed: {}", reason);
                    state.record_service_error("analyze", reason);
                }
            }
            UpdateResult::none()
        }

        Message::Format => {
            if state.is_formatting || state.source.trim().is_empty() {
                return UpdateResult::none();
            }
            state.is_formatting = true;
            UpdateResult::action(UpdateAction::Format {
                source: state.source.clone(),
                offset: state.cursor_offset,
            })
        }

        Message::FormatCompleted { original, result } => {
            state.is_formatting = false;
            let formatted = match result {
                Ok(formatted) => formatted,
                Err(reason) => {
                    warn!("Format failed: {}", reason);
                    state.record_service_error("format", reason);
                    return UpdateResult::none();
                }
            };
            if original != state.source {
                debug!("Source changed while formatting, dropping result");
                return UpdateResult::none();
            }
            if formatted.source == state.source {
                state.cursor_offset = formatted.offset.min(state.source.len());
                return UpdateResult::none();
            }
            state.set_source(formatted.source);
            state.cursor_offset = formatted.offset.min(state.source.len());
            replaced_source(state)
        }

        // ─────────────────────────────────────────────────────────
        // Service Info
        // ─────────────────────────────────────────────────────────
        Message::RequestVersion => UpdateResult::action(UpdateAction::FetchVersion),

        Message::VersionReceived(result) => {
            match result {
                Ok(version) => state.version = Some(version),
                Err(reason) => state.record_service_error("version", reason),
            }
            UpdateResult::none()
        }

        // ─────────────────────────────────────────────────────────
        // AI Code Generation
        // ─────────────────────────────────────────────────────────
        Message::GenerateCode { prompt } => {
            let request = AiRequest::generate(state.app_type(), prompt);
            submit_ai(state, request)
        }

        Message::UpdateCode { prompt } => {
            let request = AiRequest::update(state.app_type(), state.source.clone(), prompt);
            submit_ai(state, request)
        }

        Message::AiCompleted(result) => {
            let request = match std::mem::take(&mut state.ai) {
                AiState::Pending { request } => request,
                other => {
                    debug!("AI result with no pending request, ignoring");
                    state.ai = other;
                    return UpdateResult::none();
                }
            };
            match result {
                Ok(source) => {
                    state.set_source(source);
                    replaced_source(state)
                }
                Err(reason) => {
                    warn!("AI request failed: {}", reason);
                    state.record_service_error("ai", reason.clone());
                    state.ai = AiState::Failed { reason, request };
                    UpdateResult::none()
                }
            }
        }

        Message::RetryAi => match &state.ai {
            AiState::Failed { request, .. } => {
                let request = request.clone();
                state.ai = AiState::Pending {
                    request: request.clone(),
                };
                UpdateResult::action(UpdateAction::Ai(request))
            }
            _ => UpdateResult::none(),
        },

        Message::DismissAi => {
            if matches!(state.ai, AiState::Failed { .. }) {
                state.ai = AiState::Idle;
            }
            UpdateResult::none()
        }

        // ─────────────────────────────────────────────────────────
        // File Watcher
        // ─────────────────────────────────────────────────────────
        Message::WatcherError { message } => {
            warn!("File watcher error: {}", message);
            UpdateResult::none()
        }
    }
}

/// Restart the analysis debounce window for the current source
fn schedule_analysis(state: &mut AppState) -> UpdateResult {
    state.analysis_generation += 1;
    if !state.settings.analysis.enabled {
        return UpdateResult::none();
    }
    UpdateResult::action(UpdateAction::ScheduleAnalysis {
        generation: state.analysis_generation,
        delay: state.settings.analysis.debounce(),
    })
}

fn start_analysis(state: &mut AppState) -> UpdateResult {
    if !state.settings.analysis.enabled || state.source.trim().is_empty() {
        return UpdateResult::none();
    }
    state.is_analyzing = true;
    UpdateResult::action(UpdateAction::Analyze {
        generation: state.analysis_generation,
        source: state.source.clone(),
    })
}

fn submit_ai(state: &mut AppState, request: AiRequest) -> UpdateResult {
    if state.ai.is_pending() {
        debug!("AI request already in flight");
        return UpdateResult::none();
    }
    state.ai = AiState::Pending {
        request: request.clone(),
    };
    UpdateResult::action(UpdateAction::Ai(request))
}

/// Follow-up for a source replaced by the formatter or the AI endpoints
fn replaced_source(state: &mut AppState) -> UpdateResult {
    state.source_revision += 1;
    let result = UpdateResult::message(Message::AnalyzeNow);
    match &state.source_path {
        Some(path) => UpdateResult {
            action: Some(UpdateAction::PersistSource {
                path: path.clone(),
                source: state.source.clone(),
            }),
            ..result
        },
        None => result,
    }
}
