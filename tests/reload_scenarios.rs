//! End-to-end reload scenarios against a scripted service and frame
//!
//! The frame side is a task that acknowledges loads, posts the ready
//! handshake and records every delivered command.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use padlink_app::{
    ChannelFrameHost, CompileClient, FrameEndpoint, FrameHost, FrameSignal, MessageBridge,
    OrchestratorOptions, ReloadOrchestrator, RunOutcome,
};
use padlink_core::{FrameMessage, HostCommand, ReloadMode, ReloadPhase};
use padlink_service::test_utils::{FakeDartServices, FakeReply};
use padlink_service::Endpoint;

const SOURCE: &str = "void main(){}";
const TOKEN: &str = "abcdef0123456789";

struct Scenario {
    fake: Arc<FakeDartServices>,
    orchestrator: ReloadOrchestrator<FakeDartServices, ChannelFrameHost>,
    delivered: mpsc::UnboundedReceiver<HostCommand>,
}

/// Frame that loads instantly and reports ready
fn spawn_frame(mut endpoint: FrameEndpoint) -> mpsc::UnboundedReceiver<HostCommand> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(signal) = endpoint.next_signal().await {
            match signal {
                FrameSignal::Attached(element) => {
                    endpoint.mark_loaded(element.id);
                    endpoint.post_message(FrameMessage::ready(element.id.value()).to_value());
                }
                FrameSignal::Detached(_) => {}
                FrameSignal::Deliver { command, .. } => {
                    let _ = tx.send(command);
                }
            }
        }
    });
    rx
}

fn scenario() -> Scenario {
    let fake = Arc::new(FakeDartServices::new());
    let (host, endpoint, inbox) = ChannelFrameHost::new(Duration::from_millis(1000));
    let bridge = Arc::new(MessageBridge::new());
    let ready = bridge.ready_signal();
    bridge.on_frame_message(inbox, |_| std::future::ready(()));

    let orchestrator = ReloadOrchestrator::new(
        CompileClient::new(fake.clone()),
        Arc::new(host),
        ready,
        OrchestratorOptions::default(),
    );

    Scenario {
        fake,
        orchestrator,
        delivered: spawn_frame(endpoint),
    }
}

/// Scenario A: a full run delivers the decorated bootstrap script
async fn full_run(s: &mut Scenario) -> HostCommand {
    s.fake.push_compiled("// js", Some(TOKEN), Some("https://x/"));

    let outcome = s.orchestrator.run(SOURCE, ReloadMode::Full).await;
    assert!(outcome.is_delivered(), "unexpected outcome: {:?}", outcome);

    s.delivered.recv().await.unwrap()
}

#[tokio::test]
async fn test_full_run_delivers_decorated_script() {
    let mut s = scenario();

    let command = full_run(&mut s).await;

    let HostCommand::Execute { js } = command else {
        panic!("expected execute, got {:?}", command);
    };
    assert!(js.contains("require.config({\n  \"baseUrl\": \"https://x/\""));
    assert!(js.contains("let __ddcInitCode = function() {// js};"));
    assert!(js.contains(r#"require(["dart_sdk_new", "flutter_web_new"], contextLoaded);"#));

    let state = s.orchestrator.compiler().state();
    assert_eq!(state.last_compiled_source.as_deref(), Some(SOURCE));
    assert_eq!(state.incremental_token, TOKEN);
    assert!(!state.is_compiling);
}

#[tokio::test]
async fn test_hot_reload_of_unchanged_source_is_refused() {
    let mut s = scenario();
    full_run(&mut s).await;
    let before = s.orchestrator.compiler().state();

    let outcome = s.orchestrator.run(SOURCE, ReloadMode::Incremental).await;

    assert_eq!(outcome, RunOutcome::Refused);
    assert_eq!(s.fake.compile_calls().len(), 1);
    assert_eq!(s.orchestrator.compiler().state(), before);
    assert!(s.delivered.try_recv().is_err());
}

#[tokio::test]
async fn test_hot_reload_sends_token_and_raw_patch() {
    let mut s = scenario();
    full_run(&mut s).await;
    s.fake.push_compiled("// patch", Some("fedcba9876543210"), None);

    let edited = "void main(){ print(1); }";
    let outcome = s.orchestrator.run(edited, ReloadMode::Incremental).await;

    assert!(matches!(
        outcome,
        RunOutcome::Delivered {
            command: "executeReload",
            posted: true,
            ..
        }
    ));

    let calls = s.fake.compile_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].endpoint, Endpoint::CompileNewDdcReload);
    assert_eq!(calls[1].request.delta_dill.as_deref(), Some(TOKEN));
    assert_eq!(calls[1].request.source, edited);

    assert_eq!(
        s.delivered.recv().await.unwrap(),
        HostCommand::ExecuteReload {
            js: "// patch".to_string()
        }
    );
    assert_eq!(
        s.orchestrator.compiler().state().incremental_token,
        "fedcba9876543210"
    );
}

#[tokio::test]
async fn test_service_error_posts_nothing() {
    let mut s = scenario();
    s.fake.push_compile_reply(FakeReply::Status(500));

    let outcome = s.orchestrator.run(SOURCE, ReloadMode::Full).await;

    assert_eq!(
        outcome,
        RunOutcome::Failed {
            reason: "compileNewDDC request failed: 500 Internal Server Error".to_string(),
            status: Some(500),
        }
    );
    assert!(!s.orchestrator.compiler().state().is_compiling);
    assert_eq!(s.orchestrator.phase(), ReloadPhase::Idle);
    assert!(s.orchestrator.frame_host().current_frame().is_none());
    assert!(s.delivered.try_recv().is_err());
}
