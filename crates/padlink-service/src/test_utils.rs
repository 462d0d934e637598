//! Test utilities for service consumers
//!
//! [`FakeDartServices`] records every call and answers from scripted replies,
//! so compile/reload flows can be tested without a network.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use padlink_core::prelude::*;
use padlink_core::{
    AnalysisResult, CompileRequest, CompileResponse, CompletionResult, FormatResult,
    GenerateCodeRequest, ReloadMode, UpdateCodeRequest, VersionInfo,
};

use crate::channel::Endpoint;
use crate::services::DartServices;

/// Scripted answer for one call
#[derive(Debug, Clone)]
pub enum FakeReply<T> {
    Ok(T),
    /// Non-success HTTP status
    Status(u16),
    /// Answer after a delay (uses tokio time, so paused-clock tests stay fast)
    Delayed(Duration, Box<FakeReply<T>>),
}

impl<T> FakeReply<T> {
    pub fn delayed(delay: Duration, reply: FakeReply<T>) -> Self {
        FakeReply::Delayed(delay, Box::new(reply))
    }
}

/// A compile call as the fake saw it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCompile {
    pub endpoint: Endpoint,
    pub request: CompileRequest,
}

#[derive(Default)]
struct FakeState {
    compile_replies: VecDeque<FakeReply<CompileResponse>>,
    compile_calls: Vec<RecordedCompile>,
    analysis_replies: VecDeque<FakeReply<AnalysisResult>>,
    analyze_calls: Vec<String>,
    format_replies: VecDeque<FakeReply<FormatResult>>,
    completion_replies: VecDeque<FakeReply<CompletionResult>>,
    version: Option<VersionInfo>,
    ai_replies: VecDeque<FakeReply<String>>,
    ai_prompts: Vec<String>,
}

/// In-memory [`DartServices`] implementation
#[derive(Default)]
pub struct FakeDartServices {
    state: Mutex<FakeState>,
}

impl FakeDartServices {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    /// Queue a successful compile response
    pub fn push_compile(&self, response: CompileResponse) {
        self.push_compile_reply(FakeReply::Ok(response));
    }

    /// Queue a compile response built from its three wire fields
    pub fn push_compiled(&self, js: &str, delta_dill: Option<&str>, modules_base_url: Option<&str>) {
        self.push_compile(CompileResponse {
            result: Some(js.to_string()),
            delta_dill: delta_dill.map(str::to_string),
            modules_base_url: modules_base_url.map(str::to_string),
        });
    }

    pub fn push_compile_reply(&self, reply: FakeReply<CompileResponse>) {
        self.with_state(|s| s.compile_replies.push_back(reply));
    }

    pub fn compile_calls(&self) -> Vec<RecordedCompile> {
        self.with_state(|s| s.compile_calls.clone())
    }

    pub fn push_analysis(&self, reply: FakeReply<AnalysisResult>) {
        self.with_state(|s| s.analysis_replies.push_back(reply));
    }

    pub fn analyze_calls(&self) -> Vec<String> {
        self.with_state(|s| s.analyze_calls.clone())
    }

    pub fn push_format(&self, reply: FakeReply<FormatResult>) {
        self.with_state(|s| s.format_replies.push_back(reply));
    }

    pub fn push_completion(&self, reply: FakeReply<CompletionResult>) {
        self.with_state(|s| s.completion_replies.push_back(reply));
    }

    pub fn set_version(&self, version: VersionInfo) {
        self.with_state(|s| s.version = Some(version));
    }

    pub fn push_ai(&self, reply: FakeReply<String>) {
        self.with_state(|s| s.ai_replies.push_back(reply));
    }

    pub fn ai_prompts(&self) -> Vec<String> {
        self.with_state(|s| s.ai_prompts.clone())
    }
}

async fn resolve<T>(endpoint: Endpoint, reply: Option<FakeReply<T>>, fallback: T) -> Result<T> {
    let mut reply = match reply {
        Some(reply) => reply,
        None => return Ok(fallback),
    };
    loop {
        match reply {
            FakeReply::Ok(value) => return Ok(value),
            FakeReply::Status(status) => {
                return Err(Error::http(endpoint.name(), status, status_text(status)))
            }
            FakeReply::Delayed(delay, inner) => {
                tokio::time::sleep(delay).await;
                reply = *inner;
            }
        }
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Error",
    }
}

impl DartServices for FakeDartServices {
    async fn compile(&self, request: &CompileRequest, mode: ReloadMode) -> Result<CompileResponse> {
        let endpoint = Endpoint::for_compile(mode);
        let reply = self.with_state(|s| {
            s.compile_calls.push(RecordedCompile {
                endpoint,
                request: request.clone(),
            });
            s.compile_replies.pop_front()
        });
        resolve(endpoint, reply, CompileResponse::default()).await
    }

    async fn analyze(&self, source: &str) -> Result<AnalysisResult> {
        let reply = self.with_state(|s| {
            s.analyze_calls.push(source.to_string());
            s.analysis_replies.pop_front()
        });
        resolve(Endpoint::Analyze, reply, AnalysisResult::default()).await
    }

    async fn format(&self, source: &str, offset: usize) -> Result<FormatResult> {
        let reply = self.with_state(|s| s.format_replies.pop_front());
        let unchanged = FormatResult {
            source: source.to_string(),
            offset,
        };
        resolve(Endpoint::Format, reply, unchanged).await
    }

    async fn complete(&self, _source: &str, offset: usize) -> Result<CompletionResult> {
        let reply = self.with_state(|s| s.completion_replies.pop_front());
        resolve(Endpoint::Complete, reply, CompletionResult::empty(offset)).await
    }

    async fn version(&self) -> Result<VersionInfo> {
        match self.with_state(|s| s.version.clone()) {
            Some(version) => Ok(version),
            None => Err(Error::http(Endpoint::Version.name(), 404, "Not Found")),
        }
    }

    async fn generate_code(&self, request: &GenerateCodeRequest) -> Result<String> {
        let reply = self.with_state(|s| {
            s.ai_prompts.push(request.prompt.clone());
            s.ai_replies.pop_front()
        });
        resolve(Endpoint::GenerateCode, reply, String::new()).await
    }

    async fn update_code(&self, request: &UpdateCodeRequest) -> Result<String> {
        let reply = self.with_state(|s| {
            s.ai_prompts.push(request.prompt.clone());
            s.ai_replies.pop_front()
        });
        resolve(Endpoint::UpdateCode, reply, String::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::LocalDartServices;

    #[tokio::test]
    async fn test_fake_records_compile_calls() {
        let fake = FakeDartServices::new();
        fake.push_compiled("// js", Some("token-123456"), None);

        let resp = LocalDartServices::compile(
            &fake,
            &CompileRequest::full("void main() {}"),
            ReloadMode::Full,
        )
        .await
        .unwrap();

        assert_eq!(resp.result.as_deref(), Some("// js"));
        let calls = fake.compile_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].endpoint, Endpoint::CompileNewDdc);
        assert_eq!(calls[0].request.delta_dill, None);
    }

    #[tokio::test]
    async fn test_fake_status_reply() {
        let fake = FakeDartServices::new();
        fake.push_compile_reply(FakeReply::Status(500));
        let err = LocalDartServices::compile(&fake, &CompileRequest::full("x"), ReloadMode::Full)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fake_delayed_reply() {
        let fake = FakeDartServices::new();
        fake.push_analysis(FakeReply::delayed(
            Duration::from_secs(5),
            FakeReply::Ok(AnalysisResult::default()),
        ));
        let start = tokio::time::Instant::now();
        LocalDartServices::analyze(&fake, "void main() {}").await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(5));
    }
}
