//! Frame lifecycle
//!
//! The sandboxed execution frame is modelled as a single attached element
//! that is replaced on every full run. [`ChannelFrameHost`] is the host side;
//! whatever actually runs the scripts (a browser shim, a directory sink, a
//! test) drives the paired [`FrameEndpoint`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, watch};

use padlink_core::prelude::*;
use padlink_core::HostCommand;

/// Document every new frame boots from
pub const BOOT_DOCUMENT: &str = "/frame.html";

/// Upper bound on waiting for a fresh frame to report that it loaded
pub const FRAME_LOAD_TIMEOUT: Duration = Duration::from_millis(1000);

/// Identity of one frame element; a new one is minted per reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(u64);

impl FrameId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame-{}", self.0)
    }
}

/// The currently attached frame element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameElement {
    pub id: FrameId,
    pub src: String,
}

impl FrameElement {
    fn new(id: FrameId) -> Self {
        Self {
            id,
            src: BOOT_DOCUMENT.to_string(),
        }
    }
}

/// Owner of the single execution frame
#[trait_variant::make(FrameHost: Send)]
pub trait LocalFrameHost {
    /// Replace the current frame with a fresh one
    ///
    /// Resolves once the new frame reports loaded or the load timeout
    /// elapses, whichever comes first.
    async fn reset(&self) -> Result<FrameId>;

    /// Deliver a command to the current frame
    ///
    /// Returns `false` (and does nothing) when no frame is attached.
    fn post_to_frame(&self, command: HostCommand) -> bool;

    fn current_frame(&self) -> Option<FrameElement>;
}

/// What the host asks of the frame side
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSignal {
    /// A new frame element was created and should start booting
    Attached(FrameElement),
    /// The element was removed; anything it was running is gone
    Detached(FrameId),
    /// Run `command` inside `frame`
    Deliver { frame: FrameId, command: HostCommand },
}

/// In-process [`FrameHost`] backed by channels
pub struct ChannelFrameHost {
    current: Mutex<Option<FrameElement>>,
    next_id: AtomicU64,
    signal_tx: mpsc::UnboundedSender<FrameSignal>,
    loaded: Arc<watch::Sender<Option<FrameId>>>,
    load_timeout: Duration,
}

impl ChannelFrameHost {
    /// Create a host, its frame endpoint and the inbox of frame → host messages
    pub fn new(load_timeout: Duration) -> (Self, FrameEndpoint, mpsc::UnboundedReceiver<Value>) {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (loaded, _) = watch::channel(None);
        let loaded = Arc::new(loaded);

        let host = Self {
            current: Mutex::new(None),
            next_id: AtomicU64::new(0),
            signal_tx,
            loaded: loaded.clone(),
            load_timeout,
        };
        let endpoint = FrameEndpoint {
            signal_rx,
            loaded,
            outbox: inbox_tx,
        };

        (host, endpoint, inbox_rx)
    }

    fn current_element(&self) -> Option<FrameElement> {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_current(&self, element: FrameElement) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(element);
    }
}

impl FrameHost for ChannelFrameHost {
    async fn reset(&self) -> Result<FrameId> {
        let id = FrameId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);

        if let Some(previous) = self.current_element() {
            debug!("Detaching {}", previous.id);
            let _ = self.signal_tx.send(FrameSignal::Detached(previous.id));
        }

        // Subscribe before attaching so a fast load signal is not missed
        let mut loaded_rx = self.loaded.subscribe();
        self.signal_tx
            .send(FrameSignal::Attached(FrameElement::new(id)))
            .map_err(|_| Error::frame("frame endpoint is gone"))?;
        self.set_current(FrameElement::new(id));

        let loaded = tokio::time::timeout(
            self.load_timeout,
            loaded_rx.wait_for(|loaded| *loaded == Some(id)),
        )
        .await
        .map(|result| result.is_ok())
        .unwrap_or(false);

        if loaded {
            debug!("{} loaded", id);
        } else {
            debug!("{} did not report loaded within {:?}", id, self.load_timeout);
        }

        Ok(id)
    }

    fn post_to_frame(&self, command: HostCommand) -> bool {
        let Some(frame) = self.current_element() else {
            debug!("No frame attached, dropping {}", command.name());
            return false;
        };

        match self.signal_tx.send(FrameSignal::Deliver {
            frame: frame.id,
            command,
        }) {
            Ok(()) => true,
            Err(_) => {
                debug!("Frame endpoint closed, {} not delivered", frame.id);
                false
            }
        }
    }

    fn current_frame(&self) -> Option<FrameElement> {
        self.current_element()
    }
}

/// Frame side of a [`ChannelFrameHost`]
pub struct FrameEndpoint {
    signal_rx: mpsc::UnboundedReceiver<FrameSignal>,
    loaded: Arc<watch::Sender<Option<FrameId>>>,
    outbox: mpsc::UnboundedSender<Value>,
}

impl FrameEndpoint {
    /// Next request from the host; `None` once the host is dropped
    pub async fn next_signal(&mut self) -> Option<FrameSignal> {
        self.signal_rx.recv().await
    }

    /// Next request if one is already queued
    pub fn try_next_signal(&mut self) -> Option<FrameSignal> {
        self.signal_rx.try_recv().ok()
    }

    /// Report that `frame` finished loading its boot document
    pub fn mark_loaded(&self, frame: FrameId) {
        self.loaded.send_replace(Some(frame));
    }

    /// Post a raw message to the host, as `parent.postMessage` would
    pub fn post_message(&self, message: Value) -> bool {
        self.outbox.send(message).is_ok()
    }

    /// A detached sender for posting from other tasks
    pub fn outbox(&self) -> mpsc::UnboundedSender<Value> {
        self.outbox.clone()
    }
}
