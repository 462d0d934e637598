//! DartPad service payloads
//!
//! Request and response shapes for the `/api/v3` endpoints. Responses are
//! normalized on the way in: list fields the service omits deserialize to
//! empty lists, and an empty compile result is treated as "nothing to do".

use base64::Engine as _;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────
// Compile
// ─────────────────────────────────────────────────────────────────

/// Body of `compileNewDDC` / `compileNewDDCReload`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileRequest {
    pub source: String,
    /// Always serialized; `null` for full compiles
    pub delta_dill: Option<String>,
}

impl CompileRequest {
    pub fn full(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            delta_dill: None,
        }
    }

    pub fn incremental(source: impl Into<String>, delta_dill: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            delta_dill: Some(delta_dill.into()),
        }
    }
}

/// Raw compile response as returned by the service
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResponse {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub delta_dill: Option<String>,
    #[serde(default)]
    pub modules_base_url: Option<String>,
}

impl CompileResponse {
    /// Convert into a deliverable result
    ///
    /// `None` when the service answered with no compiled output, which it
    /// does for unchanged source on incremental compiles.
    pub fn into_result(self) -> Option<CompileResult> {
        let compiled_script = self.result.filter(|js| !js.is_empty())?;
        Some(CompileResult {
            compiled_script,
            incremental_token: self.delta_dill,
            module_base_url: self.modules_base_url.filter(|url| !url.is_empty()),
        })
    }
}

/// Successful compile output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileResult {
    pub compiled_script: String,
    /// Opaque `deltaDill` handle; stored and sent back verbatim
    pub incremental_token: Option<String>,
    pub module_base_url: Option<String>,
}

// ─────────────────────────────────────────────────────────────────
// Analysis / formatting / completion
// ─────────────────────────────────────────────────────────────────

/// Body of `analyze`, `format` and `complete`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRequest {
    pub source: String,
    pub offset: Option<usize>,
}

impl SourceRequest {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            offset: None,
        }
    }

    pub fn at(source: impl Into<String>, offset: usize) -> Self {
        Self {
            source: source.into(),
            offset: Some(offset),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Error,
    Warning,
    #[default]
    #[serde(other)]
    Info,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IssueLocation {
    pub char_start: usize,
    pub char_length: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DartIssue {
    #[serde(default)]
    pub kind: IssueKind,
    pub message: String,
    #[serde(default)]
    pub location: IssueLocation,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub correction: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl DartIssue {
    /// Message with the suggested correction appended on its own line
    pub fn display_message(&self) -> String {
        match &self.correction {
            Some(correction) => format!("{}\n{}", self.message, correction),
            None => self.message.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisResult {
    pub issues: Vec<DartIssue>,
    pub imports: Vec<String>,
}

impl AnalysisResult {
    pub fn error_count(&self) -> usize {
        self.count(IssueKind::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(IssueKind::Warning)
    }

    fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|issue| issue.kind == kind).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatResult {
    pub source: String,
    /// Cursor offset mapped into the formatted source
    pub offset: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompletionSuggestion {
    pub kind: String,
    pub relevance: i64,
    pub completion: String,
    pub deprecated: bool,
    pub selection_offset: usize,
    pub display_text: Option<String>,
    pub parameter_names: Option<Vec<String>>,
    pub return_type: Option<String>,
    pub element_kind: Option<String>,
    pub element_parameters: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompletionResult {
    pub replacement_offset: usize,
    pub replacement_length: usize,
    pub suggestions: Vec<CompletionSuggestion>,
}

impl CompletionResult {
    /// Placeholder returned when completion fails
    pub fn empty(offset: usize) -> Self {
        Self {
            replacement_offset: offset,
            replacement_length: 0,
            suggestions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    pub supported: bool,
}

/// Response of the `version` endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VersionInfo {
    pub dart_version: String,
    pub flutter_version: String,
    pub engine_version: Option<String>,
    pub server_revision: Option<String>,
    pub experiments: Vec<String>,
    pub packages: Vec<PackageInfo>,
}

// ─────────────────────────────────────────────────────────────────
// AI code generation
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppType {
    Dart,
    #[default]
    Flutter,
}

/// File attached to a generation prompt (usually a screenshot)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub base64_encoded_bytes: String,
    pub mime_type: String,
}

impl Attachment {
    pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            name: name.into(),
            base64_encoded_bytes: base64::engine::general_purpose::STANDARD.encode(bytes),
            mime_type: mime_type.into(),
        }
    }
}

/// Body of `generateCode`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCodeRequest {
    pub app_type: AppType,
    pub prompt: String,
    pub attachments: Vec<Attachment>,
}

/// Body of `updateCode`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCodeRequest {
    pub app_type: AppType,
    pub source: String,
    pub prompt: String,
    pub attachments: Vec<Attachment>,
}

/// Either flavour of AI request, kept around so a failed one can be retried
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiRequest {
    Generate(GenerateCodeRequest),
    Update(UpdateCodeRequest),
}

impl AiRequest {
    pub fn generate(app_type: AppType, prompt: impl Into<String>) -> Self {
        AiRequest::Generate(GenerateCodeRequest {
            app_type,
            prompt: prompt.into(),
            attachments: Vec::new(),
        })
    }

    pub fn update(app_type: AppType, source: impl Into<String>, prompt: impl Into<String>) -> Self {
        AiRequest::Update(UpdateCodeRequest {
            app_type,
            source: source.into(),
            prompt: prompt.into(),
            attachments: Vec::new(),
        })
    }

    pub fn prompt(&self) -> &str {
        match self {
            AiRequest::Generate(req) => &req.prompt,
            AiRequest::Update(req) => &req.prompt,
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        match &mut self {
            AiRequest::Generate(req) => req.attachments.push(attachment),
            AiRequest::Update(req) => req.attachments.push(attachment),
        }
        self
    }
}
