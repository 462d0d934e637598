//! Service trait for the remote DartPad API
//!
//! Everything above the transport (compile client, engine actions) talks to
//! the service through [`DartServices`], so tests can swap in a fake.

use padlink_core::prelude::*;
use padlink_core::{
    AnalysisResult, CompileRequest, CompileResponse, CompletionResult, FormatResult,
    GenerateCodeRequest, ReloadMode, UpdateCodeRequest, VersionInfo,
};

/// Remote compile/analysis operations
#[trait_variant::make(DartServices: Send)]
pub trait LocalDartServices {
    /// Compile `request` with the endpoint matching `mode`
    async fn compile(&self, request: &CompileRequest, mode: ReloadMode)
        -> Result<CompileResponse>;

    /// Static analysis of `source`
    async fn analyze(&self, source: &str) -> Result<AnalysisResult>;

    /// Format `source`, mapping the cursor `offset` into the result
    async fn format(&self, source: &str, offset: usize) -> Result<FormatResult>;

    /// Code completion at `offset`
    async fn complete(&self, source: &str, offset: usize) -> Result<CompletionResult>;

    /// SDK and package versions served by the backend
    async fn version(&self) -> Result<VersionInfo>;

    /// Generate a new program from a prompt; returns Dart source
    async fn generate_code(&self, request: &GenerateCodeRequest) -> Result<String>;

    /// Modify existing source according to a prompt; returns Dart source
    async fn update_code(&self, request: &UpdateCodeRequest) -> Result<String>;
}
