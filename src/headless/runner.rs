//! Headless mode runner - main event loop
//!
//! Wires the real service client and a directory-backed frame into the
//! engine, relays engine events to stdout and reads commands from stdin.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

use padlink_app::config::{self, Settings};
use padlink_app::{AppState, ChannelFrameHost, Engine, EngineEvent, Message};
use padlink_core::prelude::*;
use padlink_service::{Channel, DartServicesClient};

use super::frame_dir::DirectoryFrame;
use super::HeadlessEvent;

/// Options collected from the command line
#[derive(Debug, Clone)]
pub struct HeadlessOptions {
    /// The `.dart` file to compile and watch
    pub source_path: PathBuf,
    /// Overrides `[service] channel`
    pub channel: Option<String>,
    /// Overrides `[service] host`
    pub host: Option<String>,
    /// Where frame directories are created
    pub out_dir: PathBuf,
    pub watch: bool,
}

/// Run in headless mode - output JSON events on stdout
pub async fn run_headless(options: HeadlessOptions) -> Result<()> {
    info!("═══════════════════════════════════════════════════════");
    info!("padlink starting in HEADLESS mode");
    info!("Source: {}", options.source_path.display());
    info!("═══════════════════════════════════════════════════════");

    let source = tokio::fs::read_to_string(&options.source_path)
        .await
        .map_err(|_| Error::SourceNotFound {
            path: options.source_path.clone(),
        })
        .map_err(report)?;

    let project_dir = project_dir(&options.source_path);
    if let Err(e) = config::init_config_dir(&project_dir) {
        warn!("Failed to initialize .padlink directory: {}", e);
    }
    let settings = apply_overrides(config::load_settings(&project_dir), &options);

    let client = build_client(&settings).map_err(report)?;
    info!("Using service at {}", client.host());

    let (frame_host, endpoint, frame_inbox) =
        ChannelFrameHost::new(settings.reload.frame_load_timeout());
    let frame_task = DirectoryFrame::new(options.out_dir.clone())
        .with_announce(true)
        .spawn(endpoint);

    let state = AppState::new(source, settings).with_source_path(options.source_path.clone());
    let mut engine = Engine::new(
        state,
        Arc::new(client),
        Arc::new(frame_host),
        frame_inbox,
    );

    if options.watch {
        if let Err(e) = engine.start_file_watcher() {
            warn!("Failed to start file watcher: {}", e);
            report(e);
        }
    }

    let event_task = spawn_event_printer(engine.subscribe());

    let stdin_tx = engine.msg_sender();
    std::thread::spawn(move || {
        spawn_stdin_reader_blocking(stdin_tx);
    });

    // Run the program once on startup
    engine.process_message(Message::RequestVersion);
    engine.process_message(Message::Run);

    let result = headless_event_loop(&mut engine).await;

    engine.shutdown().await;
    frame_task.abort();
    // Let the printer flush the shutdown event
    let _ = tokio::time::timeout(std::time::Duration::from_millis(200), event_task).await;

    info!("padlink headless mode exiting");
    result
}

/// Main headless event loop
async fn headless_event_loop<S, H>(engine: &mut Engine<S, H>) -> Result<()>
where
    S: padlink_service::DartServices + Send + Sync + 'static,
    H: padlink_app::FrameHost + Send + Sync + 'static,
{
    loop {
        if engine.should_quit() {
            info!("Quit requested");
            break;
        }

        match engine.msg_rx.recv().await {
            Some(msg) => engine.process_message(msg),
            None => {
                info!("Message channel closed");
                break;
            }
        }
    }

    Ok(())
}

/// Relay engine events to stdout until the engine shuts down
fn spawn_event_printer(
    mut events: broadcast::Receiver<EngineEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(EngineEvent::Shutdown) => {
                    HeadlessEvent::from(EngineEvent::Shutdown).emit();
                    break;
                }
                Ok(event) => HeadlessEvent::from(event).emit(),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Event printer lagged, {} event(s) dropped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Surface an error on stdout before it is handled or propagated
fn report(e: Error) -> Error {
    HeadlessEvent::error(e.to_string(), e.is_fatal()).emit();
    e
}

/// Config lives next to the edited file
fn project_dir(source_path: &Path) -> PathBuf {
    match source_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn apply_overrides(mut settings: Settings, options: &HeadlessOptions) -> Settings {
    if let Some(channel) = &options.channel {
        settings.service.channel = channel.clone();
        // A configured host would otherwise shadow the requested channel
        settings.service.host = None;
    }
    if let Some(host) = &options.host {
        settings.service.host = Some(host.clone());
    }
    settings
}

fn build_client(settings: &Settings) -> Result<DartServicesClient> {
    let timeout = settings.service.request_timeout();
    match &settings.service.host {
        Some(host) => DartServicesClient::new(host, timeout),
        None => {
            let channel: Channel = settings
                .service
                .channel
                .parse()
                .map_err(|e: String| Error::config(e))?;
            DartServicesClient::for_channel(&channel, timeout)
        }
    }
}

/// Translate one stdin line into a message
fn parse_command(line: &str) -> Option<Message> {
    let line = line.trim();
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command {
        "r" | "reload" => Some(Message::HotReload),
        "R" | "run" => Some(Message::Run),
        "f" | "format" => Some(Message::Format),
        "a" | "analyze" => Some(Message::AnalyzeNow),
        "c" | "clear" => Some(Message::ClearLogs),
        "v" | "version" => Some(Message::RequestVersion),
        "g" | "generate" if !rest.is_empty() => Some(Message::GenerateCode {
            prompt: rest.to_string(),
        }),
        "u" | "update" if !rest.is_empty() => Some(Message::UpdateCode {
            prompt: rest.to_string(),
        }),
        "retry" => Some(Message::RetryAi),
        "dismiss" => Some(Message::DismissAi),
        "q" | "quit" => Some(Message::Quit),
        _ => None,
    }
}

/// Read commands from stdin and send them to the message channel (blocking)
fn spawn_stdin_reader_blocking(msg_tx: mpsc::Sender<Message>) {
    use std::io::BufRead;

    let stdin = std::io::stdin();
    let reader = stdin.lock();

    for line in reader.lines() {
        match line {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Some(message) => {
                        let quit = matches!(message, Message::Quit);
                        info!("Stdin: {:?}", message);
                        if msg_tx.blocking_send(message).is_err() || quit {
                            break;
                        }
                    }
                    None => warn!("Unknown stdin command: {}", line.trim()),
                }
            }
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        }
    }

    info!("Stdin reader exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> HeadlessOptions {
        HeadlessOptions {
            source_path: PathBuf::from("lib/main.dart"),
            channel: None,
            host: None,
            out_dir: PathBuf::from("out"),
            watch: false,
        }
    }

    #[test]
    fn test_parse_simple_commands() {
        assert!(matches!(parse_command("r"), Some(Message::HotReload)));
        assert!(matches!(parse_command("R"), Some(Message::Run)));
        assert!(matches!(parse_command(" f "), Some(Message::Format)));
        assert!(matches!(parse_command("a"), Some(Message::AnalyzeNow)));
        assert!(matches!(parse_command("c"), Some(Message::ClearLogs)));
        assert!(matches!(parse_command("v"), Some(Message::RequestVersion)));
        assert!(matches!(parse_command("retry"), Some(Message::RetryAi)));
        assert!(matches!(parse_command("q"), Some(Message::Quit)));
        assert!(parse_command("x").is_none());
    }

    #[test]
    fn test_parse_prompt_commands() {
        match parse_command("g a counter app  ") {
            Some(Message::GenerateCode { prompt }) => assert_eq!(prompt, "a counter app"),
            other => panic!("unexpected: {:?}", other),
        }
        match parse_command("u add a button") {
            Some(Message::UpdateCode { prompt }) => assert_eq!(prompt, "add a button"),
            other => panic!("unexpected: {:?}", other),
        }
        // A prompt is required
        assert!(parse_command("g").is_none());
    }

    #[test]
    fn test_project_dir() {
        assert_eq!(project_dir(Path::new("lib/main.dart")), PathBuf::from("lib"));
        assert_eq!(project_dir(Path::new("main.dart")), PathBuf::from("."));
    }

    #[test]
    fn test_cli_overrides_config() {
        let mut opts = options();
        opts.channel = Some("beta".to_string());
        opts.host = Some("http://localhost:9000".to_string());

        let settings = apply_overrides(Settings::default(), &opts);
        assert_eq!(settings.service.channel, "beta");
        assert_eq!(
            settings.service.host.as_deref(),
            Some("http://localhost:9000")
        );
    }

    #[test]
    fn test_cli_channel_replaces_configured_host() {
        let mut configured = Settings::default();
        configured.service.host = Some("http://localhost:9000".to_string());

        let mut opts = options();
        opts.channel = Some("beta".to_string());
        let settings = apply_overrides(configured.clone(), &opts);
        assert_eq!(settings.service.host, None);
        assert_eq!(
            build_client(&settings).unwrap().host().as_str(),
            "https://beta.api.dartpad.dev/"
        );

        // Without CLI flags the configured host stays in charge
        let settings = apply_overrides(configured, &options());
        assert_eq!(
            settings.service.host.as_deref(),
            Some("http://localhost:9000")
        );
    }

    #[test]
    fn test_build_client_from_channel() {
        let mut settings = Settings::default();
        settings.service.channel = "local".to_string();
        let client = build_client(&settings).unwrap();
        assert_eq!(client.host().as_str(), "http://localhost:8080/");
    }

    #[test]
    fn test_build_client_rejects_bad_channel() {
        let mut settings = Settings::default();
        settings.service.channel = "not a channel!".to_string();
        assert!(build_client(&settings).is_err());
    }
}
