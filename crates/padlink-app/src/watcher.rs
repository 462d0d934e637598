//! Source file watcher
//!
//! Watches the directory holding the edited `.dart` file and feeds the new
//! contents back into the engine as [`Message::SourceFileChanged`], with
//! debouncing. Whether that triggers a reload is decided by the update loop.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_full::{new_debouncer, DebounceEventResult};
use tokio::sync::mpsc;

use padlink_core::prelude::*;

use crate::message::Message;

/// Default debounce duration in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Configuration for the source watcher
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub debounce: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        }
    }
}

impl WatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set debounce duration in milliseconds
    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce = Duration::from_millis(ms);
        self
    }
}

/// Watches a single source file
pub struct SourceWatcher {
    path: PathBuf,
    config: WatcherConfig,
    stop_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl SourceWatcher {
    pub fn new(path: PathBuf, config: WatcherConfig) -> Self {
        Self {
            path,
            config,
            stop_tx: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start watching; changes arrive on `message_tx`
    pub fn start(&mut self, message_tx: mpsc::Sender<Message>) -> Result<()> {
        if self.is_running() {
            return Err(Error::watcher("Watcher is already running"));
        }
        if self.path.file_name().is_none() {
            return Err(Error::watcher(format!(
                "Not a file path: {}",
                self.path.display()
            )));
        }

        let path = self.path.clone();
        let config = self.config.clone();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel();
        self.stop_tx = Some(stop_tx);

        tokio::task::spawn_blocking(move || {
            Self::run_watcher(path, config, message_tx, stop_rx);
        });

        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }

    pub fn is_running(&self) -> bool {
        self.stop_tx.is_some()
    }

    fn run_watcher(
        path: PathBuf,
        config: WatcherConfig,
        message_tx: mpsc::Sender<Message>,
        mut stop_rx: tokio::sync::oneshot::Receiver<()>,
    ) {
        let tx_clone = message_tx.clone();
        let target = path.clone();

        let debouncer_result = new_debouncer(
            config.debounce,
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    let touched = events
                        .iter()
                        .any(|event| event.paths.iter().any(|p| is_same_file(p, &target)));
                    if !touched {
                        return;
                    }

                    match std::fs::read_to_string(&target) {
                        Ok(source) => {
                            debug!("Source file changed: {}", target.display());
                            let _ = tx_clone.blocking_send(Message::SourceFileChanged { source });
                        }
                        // Editors that save by rename briefly leave no file behind
                        Err(e) => debug!("Could not read {}: {}", target.display(), e),
                    }
                }
                Err(errors) => {
                    for error in errors {
                        warn!("File watcher error: {:?}", error);
                        let _ = tx_clone.blocking_send(Message::WatcherError {
                            message: error.to_string(),
                        });
                    }
                }
            },
        );

        let mut debouncer = match debouncer_result {
            Ok(d) => d,
            Err(e) => {
                error!("Failed to create file watcher: {}", e);
                let _ = message_tx.blocking_send(Message::WatcherError {
                    message: format!("Failed to create watcher: {}", e),
                });
                return;
            }
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if let Err(e) = debouncer.watch(&dir, RecursiveMode::NonRecursive) {
            warn!("Failed to watch {}: {}", dir.display(), e);
            let _ = message_tx.blocking_send(Message::WatcherError {
                message: e.to_string(),
            });
            return;
        }
        info!("Watching: {}", path.display());

        loop {
            match stop_rx.try_recv() {
                Ok(()) | Err(tokio::sync::oneshot::error::TryRecvError::Closed) => {
                    info!("File watcher stopping");
                    break;
                }
                Err(tokio::sync::oneshot::error::TryRecvError::Empty) => {
                    std::thread::sleep(Duration::from_millis(100));
                }
            }
        }
    }
}

impl Drop for SourceWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Only the parent directory is watched, so matching the file name suffices
fn is_same_file(event_path: &Path, target: &Path) -> bool {
    event_path.file_name().is_some() && event_path.file_name() == target.file_name()
}
