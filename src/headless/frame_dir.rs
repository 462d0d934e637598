//! Directory-backed execution frame
//!
//! Stands in for the browser frame in headless mode: every frame the host
//! creates becomes a directory under the output dir, and every delivered
//! command is written there as a numbered `.js` file, ready to be served or
//! inspected. There is no module loader to initialize, so a new frame
//! reports loaded and ready straight away.

use std::path::{Path, PathBuf};

use tokio::task::JoinHandle;

use padlink_app::{FrameEndpoint, FrameId, FrameSignal};
use padlink_core::prelude::*;
use padlink_core::{FrameMessage, HostCommand};

use super::HeadlessEvent;

pub struct DirectoryFrame {
    out_dir: PathBuf,
    /// Emit `frame_attached` events on stdout
    announce: bool,
    sequence: u64,
}

impl DirectoryFrame {
    pub fn new(out_dir: PathBuf) -> Self {
        Self {
            out_dir,
            announce: false,
            sequence: 0,
        }
    }

    pub fn with_announce(mut self, announce: bool) -> Self {
        self.announce = announce;
        self
    }

    /// Directory holding the scripts of `frame`
    pub fn frame_dir(&self, frame: FrameId) -> PathBuf {
        self.out_dir.join(frame.to_string())
    }

    /// Serve the endpoint until the host goes away
    pub fn spawn(mut self, mut endpoint: FrameEndpoint) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(signal) = endpoint.next_signal().await {
                // Failures are logged where they happen; the frame keeps serving
                let _ = self.handle(signal, &endpoint).await;
            }
            debug!("Frame host dropped, directory frame stopping");
        })
    }

    async fn handle(&mut self, signal: FrameSignal, endpoint: &FrameEndpoint) -> Result<()> {
        match signal {
            FrameSignal::Attached(element) => {
                let dir = self.frame_dir(element.id);
                tokio::fs::create_dir_all(&dir)
                    .await
                    .with_context(|| format!("Creating {}", dir.display()))?;
                info!("{} attached at {}", element.id, dir.display());
                if self.announce {
                    HeadlessEvent::frame_attached(&element.id.to_string(), &dir.to_string_lossy())
                        .emit();
                }

                endpoint.mark_loaded(element.id);
                endpoint.post_message(FrameMessage::ready(element.id.value()).to_value());
            }
            FrameSignal::Detached(id) => {
                debug!("{} detached, keeping {}", id, self.frame_dir(id).display());
            }
            FrameSignal::Deliver { frame, command } => {
                self.sequence += 1;
                let path = script_path(&self.frame_dir(frame), self.sequence, &command);
                tokio::fs::write(&path, command.script())
                    .await
                    .with_context(|| format!("Writing {}", path.display()))?;
                info!("Wrote {} to {}", command.name(), path.display());
            }
        }
        Ok(())
    }
}

fn script_path(frame_dir: &Path, sequence: u64, command: &HostCommand) -> PathBuf {
    frame_dir.join(format!("{:04}-{}.js", sequence, command.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use padlink_app::{ChannelFrameHost, FrameHost};

    #[test]
    fn test_script_path() {
        let path = script_path(
            Path::new("/out/frame-1"),
            7,
            &HostCommand::ExecuteReload { js: String::new() },
        );
        assert_eq!(path, PathBuf::from("/out/frame-1/0007-executeReload.js"));
    }

    #[tokio::test]
    async fn test_reset_loads_and_reports_ready() {
        let dir = tempfile::tempdir().unwrap();
        let (host, endpoint, mut inbox) = ChannelFrameHost::new(Duration::from_secs(5));
        let task = DirectoryFrame::new(dir.path().to_path_buf()).spawn(endpoint);

        let start = std::time::Instant::now();
        let id = host.reset().await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(dir.path().join(id.to_string()).is_dir());

        let ready = inbox.recv().await.unwrap();
        assert_eq!(FrameMessage::parse(&ready), Some(FrameMessage::ready(id.value())));

        drop(host);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_delivered_scripts_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let (host, endpoint, _inbox) = ChannelFrameHost::new(Duration::from_secs(5));
        let task = DirectoryFrame::new(dir.path().to_path_buf()).spawn(endpoint);

        let id = host.reset().await.unwrap();
        assert!(host.post_to_frame(HostCommand::Execute {
            js: "main();".to_string()
        }));
        assert!(host.post_to_frame(HostCommand::ExecuteReload {
            js: "patch();".to_string()
        }));

        // Dropping the host ends the task once the queue is drained
        drop(host);
        task.await.unwrap();

        let frame_dir = dir.path().join(id.to_string());
        assert_eq!(
            std::fs::read_to_string(frame_dir.join("0001-execute.js")).unwrap(),
            "main();"
        );
        assert_eq!(
            std::fs::read_to_string(frame_dir.join("0002-executeReload.js")).unwrap(),
            "patch();"
        );
    }
}
