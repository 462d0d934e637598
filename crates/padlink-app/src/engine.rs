//! Engine - shared orchestration state for frontends
//!
//! The Engine owns the TEA state, the message channel, the reload
//! orchestrator, the frame message router and the source watcher. Frontends
//! feed it messages and subscribe to [`EngineEvent`]s.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use padlink_core::prelude::*;
use padlink_core::{ReloadPhase, VersionInfo};
use padlink_service::DartServices;

use crate::actions::handle_action;
use crate::bridge::MessageBridge;
use crate::compiler::CompileClient;
use crate::engine_event::EngineEvent;
use crate::frame::FrameHost;
use crate::handler;
use crate::message::Message;
use crate::orchestrator::{OrchestratorOptions, ReloadOrchestrator};
use crate::state::{AiState, AppState};
use crate::watcher::{SourceWatcher, WatcherConfig};

/// Lightweight snapshot of state for change detection.
///
/// Captured before message processing, compared after to detect
/// what changed and emit appropriate EngineEvents.
#[derive(Debug, Clone)]
struct StateSnapshot {
    phase: ReloadPhase,
    run_count: u64,
    log_count: usize,
    analysis_revision: u64,
    source_revision: u64,
    ai_pending: bool,
    ai_failed: bool,
    version: Option<VersionInfo>,
    service_error_count: u64,
}

impl StateSnapshot {
    fn capture(state: &AppState) -> Self {
        Self {
            phase: state.reload_phase,
            run_count: state.run_count,
            log_count: state.logs.len(),
            analysis_revision: state.analysis_revision,
            source_revision: state.source_revision,
            ai_pending: state.ai.is_pending(),
            ai_failed: matches!(state.ai, AiState::Failed { .. }),
            version: state.version.clone(),
            service_error_count: state.service_error_count,
        }
    }
}

/// Orchestration engine for padlink.
///
/// Generic over the remote service and the frame host so tests can run the
/// whole loop against fakes.
pub struct Engine<S, H> {
    /// TEA application state (the Model)
    pub state: AppState,

    /// Sender half of the unified message channel.
    pub msg_tx: mpsc::Sender<Message>,

    /// Receiver half of the unified message channel.
    /// The frontend event loop drains messages from here.
    pub msg_rx: mpsc::Receiver<Message>,

    orchestrator: Arc<ReloadOrchestrator<S, H>>,

    bridge: Arc<MessageBridge>,

    /// Frame router and phase forwarder
    tasks: Vec<JoinHandle<()>>,

    /// None until started, or if the watcher failed to start
    file_watcher: Option<SourceWatcher>,

    /// Event broadcaster for external consumers.
    event_tx: broadcast::Sender<EngineEvent>,
}

impl<S, H> Engine<S, H>
where
    S: DartServices + Send + Sync + 'static,
    H: FrameHost + Send + Sync + 'static,
{
    /// Create a new Engine.
    ///
    /// `frame_inbox` carries every raw payload the frame posts to the host.
    /// Must be called inside a tokio runtime.
    pub fn new(
        state: AppState,
        services: Arc<S>,
        frame: Arc<H>,
        frame_inbox: mpsc::UnboundedReceiver<Value>,
    ) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel::<Message>(256);
        let (event_tx, _) = broadcast::channel(256);

        let bridge = Arc::new(MessageBridge::new());
        let options = OrchestratorOptions {
            settle_delay: state.settings.reload.settle_delay(),
            generation: state.settings.compiler.generation,
            flutter: state.settings.compiler.flutter,
        };
        let orchestrator = Arc::new(ReloadOrchestrator::new(
            CompileClient::new(services),
            frame,
            bridge.ready_signal(),
            options,
        ));

        let tasks = vec![
            Self::spawn_frame_router(&bridge, frame_inbox, msg_tx.clone()),
            Self::spawn_phase_forwarder(&orchestrator, msg_tx.clone()),
        ];

        Self {
            state,
            msg_tx,
            msg_rx,
            orchestrator,
            bridge,
            tasks,
            file_watcher: None,
            event_tx,
        }
    }

    /// Subscribe to engine events.
    ///
    /// If the subscriber falls behind (buffer full), older events are
    /// dropped. Use `broadcast::error::RecvError::Lagged` to detect this.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    pub fn orchestrator(&self) -> &Arc<ReloadOrchestrator<S, H>> {
        &self.orchestrator
    }

    pub fn bridge(&self) -> &Arc<MessageBridge> {
        &self.bridge
    }

    /// Watch `state.source_path` for edits made outside padlink
    pub fn start_file_watcher(&mut self) -> Result<()> {
        let Some(path) = self.state.source_path.clone() else {
            return Err(Error::watcher("No source file to watch"));
        };
        let mut watcher = SourceWatcher::new(
            path,
            WatcherConfig::new().with_debounce_ms(self.state.settings.watcher.debounce_ms),
        );
        watcher.start(self.msg_tx.clone())?;
        self.file_watcher = Some(watcher);
        Ok(())
    }

    /// Process a single message through the TEA update cycle.
    ///
    /// Follow-up messages are processed in the same cycle; actions are
    /// dispatched as background tasks.
    pub fn process_message(&mut self, msg: Message) {
        let pre = StateSnapshot::capture(&self.state);

        let mut msg = Some(msg);
        while let Some(m) = msg {
            let result = handler::update(&mut self.state, m);
            if let Some(action) = result.action {
                handle_action(action, &self.orchestrator, self.msg_tx.clone());
            }
            msg = result.message;
        }

        let post = StateSnapshot::capture(&self.state);
        self.emit_events(&pre, &post);
    }

    /// Drain and process all pending messages from the channel.
    ///
    /// Returns the number of messages processed.
    pub fn drain_pending_messages(&mut self) -> usize {
        let mut count = 0;
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.process_message(msg);
            count += 1;
        }
        count
    }

    /// Get a clone of the message sender for spawning input sources.
    pub fn msg_sender(&self) -> mpsc::Sender<Message> {
        self.msg_tx.clone()
    }

    pub fn should_quit(&self) -> bool {
        self.state.should_quit()
    }

    /// Stop the watcher and background routing tasks.
    pub async fn shutdown(&mut self) {
        self.emit(EngineEvent::Shutdown);

        if let Some(ref mut watcher) = self.file_watcher {
            watcher.stop();
        }

        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!("Engine stopped after {} run(s)", self.state.run_count);
    }

    fn spawn_frame_router(
        bridge: &Arc<MessageBridge>,
        inbox: mpsc::UnboundedReceiver<Value>,
        msg_tx: mpsc::Sender<Message>,
    ) -> JoinHandle<()> {
        bridge.clone().on_frame_message(inbox, move |message| {
            let msg_tx = msg_tx.clone();
            async move {
                if let Some(entry) = message.to_log_entry() {
                    let _ = msg_tx.send(Message::FrameLog(entry)).await;
                }
            }
        })
    }

    fn spawn_phase_forwarder(
        orchestrator: &Arc<ReloadOrchestrator<S, H>>,
        msg_tx: mpsc::Sender<Message>,
    ) -> JoinHandle<()> {
        let mut phase_rx = orchestrator.subscribe_phase();
        tokio::spawn(async move {
            while phase_rx.changed().await.is_ok() {
                let phase = *phase_rx.borrow_and_update();
                if msg_tx.send(Message::ReloadPhaseChanged(phase)).await.is_err() {
                    break;
                }
            }
        })
    }

    /// Emit EngineEvents based on state changes after processing.
    fn emit_events(&self, pre: &StateSnapshot, post: &StateSnapshot) {
        if pre.phase != post.phase {
            self.emit(EngineEvent::PhaseChanged {
                old_phase: pre.phase,
                new_phase: post.phase,
            });
        }

        if post.run_count > pre.run_count {
            if let Some(outcome) = &self.state.last_run {
                self.emit(EngineEvent::RunCompleted {
                    mode: self.state.last_run_mode,
                    outcome: outcome.clone(),
                    hot_reload_available: self.state.hot_reload_available,
                });
            }
        }

        // A shrinking console means it was cleared
        let first_new = if post.log_count < pre.log_count {
            self.emit(EngineEvent::LogsCleared);
            0
        } else {
            pre.log_count
        };
        for entry in self.state.logs.since(first_new) {
            self.emit(EngineEvent::Log {
                entry: entry.clone(),
            });
        }

        if post.analysis_revision != pre.analysis_revision {
            if let Some(analysis) = &self.state.analysis {
                self.emit(EngineEvent::AnalysisUpdated {
                    errors: analysis.error_count(),
                    warnings: analysis.warning_count(),
                });
            }
        }

        if post.source_revision != pre.source_revision {
            self.emit(EngineEvent::SourceReplaced {
                revision: post.source_revision,
                source: self.state.source.clone(),
            });
        }

        if post.ai_pending && !pre.ai_pending {
            if let Some(request) = self.state.ai.request() {
                self.emit(EngineEvent::AiPending {
                    prompt: request.prompt().to_string(),
                });
            }
        }
        if post.ai_failed && !pre.ai_failed {
            if let AiState::Failed { reason, .. } = &self.state.ai {
                self.emit(EngineEvent::AiFailed {
                    reason: reason.clone(),
                });
            }
        }

        if post.version != pre.version {
            if let Some(version) = &post.version {
                self.emit(EngineEvent::VersionReceived {
                    version: version.clone(),
                });
            }
        }

        if post.service_error_count > pre.service_error_count {
            if let Some((operation, reason)) = &self.state.last_service_error {
                self.emit(EngineEvent::ServiceError {
                    operation: operation.clone(),
                    reason: reason.clone(),
                });
            }
        }
    }

    /// send() only fails when nobody is subscribed
    fn emit(&self, event: EngineEvent) {
        let _ = self.event_tx.send(event);
    }
}
