//! Host ↔ frame wire protocol
//!
//! The host sends `{command, js}` objects into the sandboxed frame; the frame
//! answers with `{sender: "frame", type, message}` objects. Inbound payloads
//! arrive as untyped JSON and are only trusted after [`FrameMessage::parse`].

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::types::LogEntry;

/// Value of the `sender` field on every message the frame emits
pub const FRAME_SENDER: &str = "frame";

/// Command posted from the host into the frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum HostCommand {
    /// Run a fully decorated bootstrap script in a fresh frame
    #[serde(rename = "execute")]
    Execute { js: String },
    /// Apply a hot-reload patch to the running program
    #[serde(rename = "executeReload")]
    ExecuteReload { js: String },
}

impl HostCommand {
    /// Wire name of the command
    pub fn name(&self) -> &'static str {
        match self {
            HostCommand::Execute { .. } => "execute",
            HostCommand::ExecuteReload { .. } => "executeReload",
        }
    }

    pub fn script(&self) -> &str {
        match self {
            HostCommand::Execute { js } | HostCommand::ExecuteReload { js } => js,
        }
    }
}

/// A validated message from the frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameMessage {
    /// `print()` output
    Stdout(String),
    /// Uncaught script error (`jserr` from the new loader, `stderr` from the legacy one)
    Error(String),
    /// The frame's module loader finished initializing
    ///
    /// Frames that know their element id send it along so a late handshake
    /// from a replaced frame can be told apart from the live one.
    Ready { frame: Option<u64> },
}

impl FrameMessage {
    /// Ready handshake tagged with the posting frame's id
    pub fn ready(frame: u64) -> Self {
        FrameMessage::Ready { frame: Some(frame) }
    }

    /// Validate an inbound payload
    ///
    /// Returns `None` for anything that is not an object whose `sender` is
    /// `"frame"`, and for frame messages of an unknown `type`.
    pub fn parse(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        if obj.get("sender").and_then(Value::as_str) != Some(FRAME_SENDER) {
            return None;
        }

        let message = match obj.get("message") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        match obj.get("type").and_then(Value::as_str)? {
            "stdout" => Some(FrameMessage::Stdout(message)),
            "jserr" | "stderr" => Some(FrameMessage::Error(message)),
            "ready" => Some(FrameMessage::Ready {
                frame: obj.get("frame").and_then(Value::as_u64),
            }),
            _ => None,
        }
    }

    /// Console entry for output messages; `None` for the ready handshake
    pub fn to_log_entry(&self) -> Option<LogEntry> {
        match self {
            FrameMessage::Stdout(message) => Some(LogEntry::stdout(message.clone())),
            FrameMessage::Error(message) => Some(LogEntry::error(message.clone())),
            FrameMessage::Ready { .. } => None,
        }
    }

    /// Encode as the frame would post it
    pub fn to_value(&self) -> Value {
        match self {
            FrameMessage::Stdout(message) => {
                json!({ "sender": FRAME_SENDER, "type": "stdout", "message": message })
            }
            FrameMessage::Error(message) => {
                json!({ "sender": FRAME_SENDER, "type": "jserr", "message": message })
            }
            FrameMessage::Ready { frame: None } => {
                json!({ "sender": FRAME_SENDER, "type": "ready" })
            }
            FrameMessage::Ready { frame: Some(id) } => {
                json!({ "sender": FRAME_SENDER, "type": "ready", "frame": id })
            }
        }
    }
}
