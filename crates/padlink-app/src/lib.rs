//! padlink-app - Compile, frame delivery and reload orchestration
//!
//! This crate implements the compile → deliver → reload cycle on top of the
//! service client: the compile client and its hot reload token, the frame
//! host abstraction, the bootstrap script decorator, the frame message
//! bridge and the reload orchestrator. Around them sits a TEA (The Elm
//! Architecture) state loop driven by the [`Engine`], plus configuration
//! loading and source file watching.

pub mod actions;
pub mod bridge;
pub mod compiler;
pub mod config;
pub mod console;
pub mod decorator;
pub mod engine;
pub mod engine_event;
pub mod frame;
pub mod handler;
pub mod message;
pub mod orchestrator;
pub mod state;
pub mod watcher;

// Re-export primary types
pub use bridge::{MessageBridge, ReadySignal, ReadyState};
pub use compiler::{CompilationState, CompileClient, CompileOutcome};
pub use decorator::{decorate, DecorateOptions};
pub use engine::Engine;
pub use engine_event::EngineEvent;
pub use frame::{
    ChannelFrameHost, FrameElement, FrameEndpoint, FrameHost, FrameId, FrameSignal, LocalFrameHost,
};
pub use handler::{UpdateAction, UpdateResult};
pub use message::Message;
pub use orchestrator::{OrchestratorOptions, ReloadOrchestrator, RunOutcome};
pub use state::{AiState, AppState};
