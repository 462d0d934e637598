//! # padlink-core - Core Domain Types
//!
//! Foundation crate for padlink. Provides domain types, error handling,
//! logging setup, the host ↔ frame wire protocol and the DartPad service
//! payloads.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, chrono, thiserror, tracing, base64).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`ReloadMode`] - Full run vs hot reload
//! - [`ReloadPhase`] - Orchestrator phase (Idle, Compiling, Delivering)
//! - [`CompilerGeneration`] - New DDC module loader vs legacy AMD loader
//! - [`LogEntry`], [`LogKind`] - Program output relayed from the frame
//!
//! ### Frame Protocol (`frame`)
//! - [`HostCommand`] - `execute` / `executeReload` posted into the frame
//! - [`FrameMessage`] - Validated `{sender: "frame", ...}` message
//!
//! ### Service Payloads (`api`)
//! - [`CompileRequest`], [`CompileResponse`], [`CompileResult`]
//! - [`AnalysisResult`], [`FormatResult`], [`CompletionResult`], [`VersionInfo`]
//! - [`AiRequest`], [`Attachment`], [`AppType`]
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use padlink_core::prelude::*;
//! ```

pub mod api;
pub mod error;
pub mod frame;
pub mod logging;
pub mod prelude;
pub mod types;

pub use api::{
    AiRequest, AnalysisResult, AppType, Attachment, CompileRequest, CompileResponse,
    CompileResult, CompletionResult, CompletionSuggestion, DartIssue, FormatResult,
    GenerateCodeRequest, IssueKind, IssueLocation, PackageInfo, SourceRequest,
    UpdateCodeRequest, VersionInfo,
};
pub use error::{Error, Result, ResultExt};
pub use frame::{FrameMessage, HostCommand, FRAME_SENDER};
pub use types::{CompilerGeneration, LogEntry, LogKind, ReloadMode, ReloadPhase};
