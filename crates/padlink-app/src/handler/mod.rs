//! Handler module - TEA update function
//!
//! - `update`: Main update() function and message dispatch

pub(crate) mod update;


use std::path::PathBuf;
use std::time::Duration;

use padlink_core::{AiRequest, ReloadMode};

use crate::message::Message;

// Re-export main entry point
pub use update::update;

/// Actions that the event loop should perform after update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateAction {
    /// Compile `source` and deliver it to the frame
    RunCycle { source: String, mode: ReloadMode },

    /// Fire `Message::AnalysisDue` for `generation` after `delay`
    ScheduleAnalysis { generation: u64, delay: Duration },

    /// Analyze `source` now
    Analyze { generation: u64, source: String },

    /// Format `source`, remapping the cursor at `offset`
    Format { source: String, offset: usize },

    /// Query SDK and package versions
    FetchVersion,

    /// Send a generate/update request to the AI endpoints
    Ai(AiRequest),

    /// Mirror a replaced source back to its file
    PersistSource { path: PathBuf, source: String },
}

/// Result of processing a message
#[derive(Debug, Default)]
pub struct UpdateResult {
    /// Optional follow-up message to process
    pub message: Option<Message>,
    /// Optional action for the event loop to perform
    pub action: Option<UpdateAction>,
}

impl UpdateResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn message(msg: Message) -> Self {
        Self {
            message: Some(msg),
            action: None,
        }
    }

    pub fn action(action: UpdateAction) -> Self {
        Self {
            message: None,
            action: Some(action),
        }
    }

    pub fn with_message(mut self, msg: Message) -> Self {
        self.message = Some(msg);
        self
    }
}
