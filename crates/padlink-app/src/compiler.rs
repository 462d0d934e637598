//! Compile client
//!
//! Wraps [`DartServices::compile`] with the bookkeeping hot reload depends
//! on: the `deltaDill` token of the last successful compile and the source
//! it was compiled from. Every request is numbered; a response that arrives
//! after a newer request was issued is dropped without touching state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use padlink_core::prelude::*;
use padlink_core::{CompileRequest, CompileResult, ReloadMode};
use padlink_service::DartServices;

/// Shortest `deltaDill` token that makes hot reload available
pub const MIN_INCREMENTAL_TOKEN_LEN: usize = 8;

/// Incremental compilation bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilationState {
    /// Source of the last compile that produced output
    pub last_compiled_source: Option<String>,
    /// Opaque `deltaDill` from that compile; empty when none was returned
    pub incremental_token: String,
    pub is_compiling: bool,
}

impl CompilationState {
    pub fn hot_reload_available(&self) -> bool {
        self.incremental_token.len() >= MIN_INCREMENTAL_TOKEN_LEN
    }

    /// Hot reload needs a usable token and an actual edit since the last compile
    pub fn can_hot_reload(&self, source: &str) -> bool {
        self.hot_reload_available() && self.last_compiled_source.as_deref() != Some(source)
    }
}

/// Result of one compile call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    Compiled(CompileResult),
    /// The service answered with no output; nothing to deliver
    NothingToDo,
    /// A newer request was issued while this one was in flight
    Superseded,
}

pub struct CompileClient<S> {
    service: Arc<S>,
    state: Mutex<CompilationState>,
    sequence: AtomicU64,
}

impl<S: DartServices> CompileClient<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self {
            service,
            state: Mutex::new(CompilationState::default()),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    /// Snapshot of the bookkeeping
    pub fn state(&self) -> CompilationState {
        self.lock_state().clone()
    }

    pub fn hot_reload_available(&self) -> bool {
        self.lock_state().hot_reload_available()
    }

    pub fn can_hot_reload(&self, source: &str) -> bool {
        self.lock_state().can_hot_reload(source)
    }

    /// Forget the token and last compiled source
    ///
    /// Any compile still in flight is superseded.
    pub fn invalidate(&self) {
        self.sequence.fetch_add(1, Ordering::SeqCst);
        *self.lock_state() = CompilationState::default();
    }

    /// Compile `source` with the endpoint for `mode`
    ///
    /// Incremental requests carry the stored token. HTTP and transport
    /// failures are returned unchanged and leave the token alone.
    pub async fn compile(&self, source: &str, mode: ReloadMode) -> Result<CompileOutcome> {
        let (sequence, request) = {
            let mut state = self.lock_state();
            state.is_compiling = true;
            let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
            let request = match mode {
                ReloadMode::Full => CompileRequest::full(source),
                ReloadMode::Incremental => {
                    CompileRequest::incremental(source, state.incremental_token.clone())
                }
            };
            (sequence, request)
        };

        debug!("Compile #{} ({})", sequence, mode);
        let response = self.service.compile(&request, mode).await;

        let mut state = self.lock_state();
        if self.sequence.load(Ordering::SeqCst) != sequence {
            debug!("Dropping stale compile #{}", sequence);
            return Ok(CompileOutcome::Superseded);
        }
        state.is_compiling = false;

        let Some(result) = response?.into_result() else {
            debug!("Compile #{} produced no output", sequence);
            return Ok(CompileOutcome::NothingToDo);
        };

        state.incremental_token = result.incremental_token.clone().unwrap_or_default();
        state.last_compiled_source = Some(source.to_string());
        Ok(CompileOutcome::Compiled(result))
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, CompilationState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
