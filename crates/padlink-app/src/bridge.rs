//! Frame → host message routing
//!
//! Every payload the frame posts lands in one inbox. The bridge validates it
//! with [`FrameMessage::parse`], records ready handshakes and hands the rest
//! to a handler. Nothing is acknowledged back to the frame.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use padlink_core::prelude::*;
use padlink_core::FrameMessage;

use crate::frame::FrameId;

/// Ready handshakes seen so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadyState {
    pub count: u64,
    /// Frame id carried by the latest handshake, if it had one
    pub frame: Option<u64>,
}

impl ReadyState {
    /// Whether `frame` has reported ready since the counter stood at `seen`
    ///
    /// Untagged handshakes are credited to whichever frame is waiting.
    pub fn reported(&self, frame: FrameId, seen: u64) -> bool {
        self.count > seen && self.frame.map_or(true, |id| id == frame.value())
    }
}

/// Validates inbound frame messages and tracks the ready handshake
#[derive(Debug)]
pub struct MessageBridge {
    ready_tx: watch::Sender<ReadyState>,
}

impl Default for MessageBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBridge {
    pub fn new() -> Self {
        let (ready_tx, _) = watch::channel(ReadyState::default());
        Self { ready_tx }
    }

    /// Validate one raw payload
    ///
    /// Ready handshakes bump the ready counter before being returned.
    pub fn accept(&self, value: &Value) -> Option<FrameMessage> {
        let Some(message) = FrameMessage::parse(value) else {
            trace!("Ignoring non-frame message: {}", value);
            return None;
        };

        if let FrameMessage::Ready { frame } = message {
            self.ready_tx.send_modify(|state| {
                state.count += 1;
                state.frame = frame;
            });
        }

        Some(message)
    }

    /// Observer of the ready handshakes
    pub fn ready_signal(&self) -> ReadySignal {
        ReadySignal {
            rx: self.ready_tx.subscribe(),
        }
    }

    /// Route every valid message from `inbox` to `handler`, in arrival order
    ///
    /// The task ends when every sender of the inbox is dropped.
    pub fn on_frame_message<F, Fut>(
        self: Arc<Self>,
        mut inbox: mpsc::UnboundedReceiver<Value>,
        mut handler: F,
    ) -> JoinHandle<()>
    where
        F: FnMut(FrameMessage) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(async move {
            while let Some(value) = inbox.recv().await {
                if let Some(message) = self.accept(&value) {
                    handler(message).await;
                }
            }
            debug!("Frame inbox closed");
        })
    }
}

/// Read side of the ready handshakes
#[derive(Debug, Clone)]
pub struct ReadySignal {
    rx: watch::Receiver<ReadyState>,
}

impl ReadySignal {
    /// Number of ready handshakes seen so far
    pub fn count(&self) -> u64 {
        self.rx.borrow().count
    }

    pub fn state(&self) -> ReadyState {
        *self.rx.borrow()
    }

    /// Wait until `frame` reports ready after the counter stood at `seen`,
    /// for at most `limit`
    ///
    /// Returns whether the handshake arrived in time.
    pub async fn wait_for_frame(
        &mut self,
        frame: FrameId,
        seen: u64,
        limit: Duration,
    ) -> bool {
        tokio::time::timeout(limit, self.rx.wait_for(|state| state.reported(frame, seen)))
            .await
            .map(|result| result.is_ok())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    const FRAME: FrameId = FrameId::new(1);

    #[test]
    fn test_accept_filters_foreign_payloads() {
        let bridge = MessageBridge::new();

        assert_eq!(bridge.accept(&json!("hello")), None);
        assert_eq!(
            bridge.accept(&json!({ "sender": "ext", "type": "stdout", "message": "x" })),
            None
        );
        assert_eq!(
            bridge.accept(&json!({ "sender": "frame", "type": "stdout", "message": "x" })),
            Some(FrameMessage::Stdout("x".to_string()))
        );
        assert_eq!(bridge.ready_signal().count(), 0);
    }

    #[test]
    fn test_ready_bumps_counter() {
        let bridge = MessageBridge::new();
        let signal = bridge.ready_signal();

        bridge.accept(&FrameMessage::Ready { frame: None }.to_value());
        bridge.accept(&FrameMessage::ready(4).to_value());

        assert_eq!(
            signal.state(),
            ReadyState {
                count: 2,
                frame: Some(4)
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_frame_times_out() {
        let bridge = MessageBridge::new();
        let mut signal = bridge.ready_signal();

        let start = tokio::time::Instant::now();
        assert!(!signal.wait_for_frame(FRAME, 0, Duration::from_millis(500)).await);
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_wait_for_frame_returns_immediately_when_already_ready() {
        let bridge = MessageBridge::new();
        let mut signal = bridge.ready_signal();
        bridge.accept(&FrameMessage::ready(FRAME.value()).to_value());

        assert!(signal.wait_for_frame(FRAME, 0, Duration::from_secs(60)).await);
    }

    #[tokio::test]
    async fn test_wait_for_frame_wakes_on_ready() {
        let bridge = MessageBridge::new();
        let mut signal = bridge.ready_signal();

        let mut wait =
            tokio_test::task::spawn(signal.wait_for_frame(FRAME, 0, Duration::from_secs(60)));
        tokio_test::assert_pending!(wait.poll());

        bridge.accept(&FrameMessage::ready(FRAME.value()).to_value());
        assert!(wait.is_woken());
        tokio_test::assert_ready_eq!(wait.poll(), true);
    }

    #[tokio::test]
    async fn test_handshake_from_replaced_frame_is_not_credited() {
        let bridge = MessageBridge::new();
        let mut signal = bridge.ready_signal();
        let next = FrameId::new(2);

        let mut wait =
            tokio_test::task::spawn(signal.wait_for_frame(next, 0, Duration::from_secs(60)));
        tokio_test::assert_pending!(wait.poll());

        // Late handshake from the frame that was just detached
        bridge.accept(&FrameMessage::ready(FRAME.value()).to_value());
        tokio_test::assert_pending!(wait.poll());

        bridge.accept(&FrameMessage::ready(next.value()).to_value());
        tokio_test::assert_ready_eq!(wait.poll(), true);
    }

    #[test]
    fn test_untagged_handshake_counts_for_any_frame() {
        let state = ReadyState {
            count: 1,
            frame: None,
        };
        assert!(state.reported(FRAME, 0));
        assert!(!state.reported(FRAME, 1));
    }

    #[tokio::test]
    async fn test_on_frame_message_routes_valid_messages() {
        let bridge = Arc::new(MessageBridge::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let received = Arc::new(Mutex::new(Vec::new()));

        let sink = received.clone();
        let task = bridge
            .clone()
            .on_frame_message(rx, move |message| {
                sink.lock().unwrap().push(message);
                std::future::ready(())
            });

        tx.send(json!({ "sender": "frame", "type": "stdout", "message": "hi" }))
            .unwrap();
        tx.send(json!({ "sender": "frame", "type": "unknown" })).unwrap();
        tx.send(json!(42)).unwrap();
        tx.send(json!({ "sender": "frame", "type": "jserr", "message": "boom" }))
            .unwrap();
        tx.send(FrameMessage::ready(1).to_value()).unwrap();
        drop(tx);
        task.await.unwrap();

        assert_eq!(
            *received.lock().unwrap(),
            vec![
                FrameMessage::Stdout("hi".to_string()),
                FrameMessage::Error("boom".to_string()),
                FrameMessage::ready(1),
            ]
        );
        assert_eq!(bridge.ready_signal().count(), 1);
    }
}
