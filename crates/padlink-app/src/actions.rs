//! Action handlers: UpdateAction dispatch and background task spawning
//!
//! Every action runs in its own task and reports back to the engine through
//! `msg_tx`. Service errors are flattened to strings so messages stay `Clone`.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use padlink_core::{AiRequest, ResultExt};
use padlink_service::DartServices;

use crate::frame::FrameHost;
use crate::handler::UpdateAction;
use crate::message::Message;
use crate::orchestrator::ReloadOrchestrator;

/// Execute an action by spawning a background task
pub fn handle_action<S, H>(
    action: UpdateAction,
    orchestrator: &Arc<ReloadOrchestrator<S, H>>,
    msg_tx: mpsc::Sender<Message>,
) where
    S: DartServices + Send + Sync + 'static,
    H: FrameHost + Send + Sync + 'static,
{
    let service = orchestrator.compiler().service().clone();

    match action {
        UpdateAction::RunCycle { source, mode } => {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                let outcome = orchestrator.run(&source, mode).await;
                let hot_reload_available = orchestrator.compiler().hot_reload_available();
                send(
                    &msg_tx,
                    Message::RunFinished {
                        mode,
                        source,
                        outcome,
                        hot_reload_available,
                    },
                )
                .await;
            });
        }

        UpdateAction::ScheduleAnalysis { generation, delay } => {
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                send(&msg_tx, Message::AnalysisDue { generation }).await;
            });
        }

        UpdateAction::Analyze { generation, source } => {
            tokio::spawn(async move {
                let result = service.analyze(&source).await.map_err(|e| e.to_string());
                send(&msg_tx, Message::AnalysisCompleted { generation, result }).await;
            });
        }

        UpdateAction::Format { source, offset } => {
            tokio::spawn(async move {
                let result = service
                    .format(&source, offset)
                    .await
                    .map_err(|e| e.to_string());
                send(
                    &msg_tx,
                    Message::FormatCompleted {
                        original: source,
                        result,
                    },
                )
                .await;
            });
        }

        UpdateAction::FetchVersion => {
            tokio::spawn(async move {
                let result = service.version().await.map_err(|e| e.to_string());
                send(&msg_tx, Message::VersionReceived(result)).await;
            });
        }

        UpdateAction::Ai(request) => {
            tokio::spawn(async move {
                let result = match &request {
                    AiRequest::Generate(req) => service.generate_code(req).await,
                    AiRequest::Update(req) => service.update_code(req).await,
                };
                send(&msg_tx, Message::AiCompleted(result.map_err(|e| e.to_string()))).await;
            });
        }

        UpdateAction::PersistSource { path, source } => {
            tokio::spawn(async move {
                let written = tokio::fs::write(&path, source)
                    .await
                    .with_context(|| format!("Writing source back to {}", path.display()));
                if written.is_ok() {
                    debug!("Wrote source back to {}", path.display());
                }
            });
        }
    }
}

async fn send(msg_tx: &mpsc::Sender<Message>, message: Message) {
    if msg_tx.send(message).await.is_err() {
        debug!("Engine gone, dropping action result");
    }
}
