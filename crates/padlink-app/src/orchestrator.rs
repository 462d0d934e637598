//! Reload orchestration
//!
//! Sequences one run: compile, then (for a full run) replace the frame and
//! wait for it to settle, then decorate and deliver. Failures at any step
//! end the run in [`RunOutcome::Failed`]; nothing escapes to the caller.
//!
//! Deliveries are serialized. Once a newer full run has compiled, an older
//! run stops at its next suspension point and posts nothing, so a fresh
//! frame only ever receives the bootstrap of the run that created it.
//!
//! ```text
//! Idle ──run──▶ Compiling ──ok──▶ Delivering ──posted──▶ Idle
//!                   │
//!                   └──error / empty──▶ Idle
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{watch, Mutex as AsyncMutex};

use padlink_core::prelude::*;
use padlink_core::{CompileResult, CompilerGeneration, HostCommand, ReloadMode, ReloadPhase};
use padlink_service::DartServices;

use crate::bridge::ReadySignal;
use crate::compiler::{CompileClient, CompileOutcome};
use crate::decorator::{decorate, DecorateOptions};
use crate::frame::{FrameHost, FrameId};

/// Longest wait for the frame's ready handshake before delivering anyway
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Knobs that shape delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorOptions {
    pub settle_delay: Duration,
    pub generation: CompilerGeneration,
    pub flutter: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            settle_delay: SETTLE_DELAY,
            generation: CompilerGeneration::NewDdc,
            flutter: true,
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Compiled output was handed to the frame host
    Delivered {
        mode: ReloadMode,
        /// Frame the command targeted
        frame: Option<FrameId>,
        /// Wire name of the command (`execute` / `executeReload`)
        command: &'static str,
        /// `false` when no frame was attached to receive it
        posted: bool,
    },
    /// Blank source, or the service compiled to nothing
    NothingToDo,
    /// Hot reload requested without a usable token or without an edit
    Refused,
    /// A newer run replaced this one before it could deliver
    Superseded,
    Failed {
        reason: String,
        /// HTTP status when the service answered with one
        status: Option<u16>,
    },
}

impl RunOutcome {
    fn failed(error: &Error) -> Self {
        RunOutcome::Failed {
            reason: error.to_string(),
            status: error.status(),
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, RunOutcome::Delivered { .. })
    }
}

pub struct ReloadOrchestrator<S, H> {
    compiler: CompileClient<S>,
    frame: Arc<H>,
    ready: ReadySignal,
    /// The current frame and the ready counter as it was when it was created
    ready_mark: Mutex<Option<(FrameId, u64)>>,
    options: OrchestratorOptions,
    phase_tx: watch::Sender<ReloadPhase>,
    runs: AtomicU64,
    /// Number of the latest full run that compiled successfully
    latest_full: AtomicU64,
    delivery: AsyncMutex<()>,
}

impl<S, H> ReloadOrchestrator<S, H>
where
    S: DartServices,
    H: FrameHost,
{
    pub fn new(
        compiler: CompileClient<S>,
        frame: Arc<H>,
        ready: ReadySignal,
        options: OrchestratorOptions,
    ) -> Self {
        let (phase_tx, _) = watch::channel(ReloadPhase::Idle);
        Self {
            compiler,
            frame,
            ready,
            ready_mark: Mutex::new(None),
            options,
            phase_tx,
            runs: AtomicU64::new(0),
            latest_full: AtomicU64::new(0),
            delivery: AsyncMutex::new(()),
        }
    }

    pub fn compiler(&self) -> &CompileClient<S> {
        &self.compiler
    }

    pub fn frame_host(&self) -> &Arc<H> {
        &self.frame
    }

    pub fn phase(&self) -> ReloadPhase {
        *self.phase_tx.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<ReloadPhase> {
        self.phase_tx.subscribe()
    }

    /// Compile `source` and deliver it to the frame
    pub async fn run(&self, source: &str, mode: ReloadMode) -> RunOutcome {
        if source.trim().is_empty() {
            debug!("Ignoring run of blank source");
            return RunOutcome::NothingToDo;
        }

        if mode.is_incremental() && !self.compiler.can_hot_reload(source) {
            debug!("Hot reload refused: no usable token or no change since last compile");
            return RunOutcome::Refused;
        }

        let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        self.phase_tx.send_replace(ReloadPhase::Compiling);

        let compiled = match self.compiler.compile(source, mode).await {
            Ok(CompileOutcome::Compiled(result)) => result,
            Ok(CompileOutcome::NothingToDo) => {
                self.finish(run);
                return RunOutcome::NothingToDo;
            }
            Ok(CompileOutcome::Superseded) => return RunOutcome::Superseded,
            Err(e) => {
                warn!("{} compile failed: {}", mode, e);
                self.finish(run);
                return RunOutcome::failed(&e);
            }
        };

        if !mode.is_incremental() {
            self.latest_full.fetch_max(run, Ordering::SeqCst);
        }
        self.set_phase(run, ReloadPhase::Delivering);
        let outcome = {
            let _delivery = self.delivery.lock().await;
            match mode {
                ReloadMode::Full => self.deliver_full(run, &compiled).await,
                ReloadMode::Incremental => self.deliver_incremental(run, &compiled).await,
            }
        };
        self.finish(run);

        outcome.unwrap_or_else(|e| {
            warn!("{} delivery failed: {}", mode, e);
            RunOutcome::failed(&e)
        })
    }

    async fn deliver_full(&self, run: u64, compiled: &CompileResult) -> Result<RunOutcome> {
        if self.overtaken(run) {
            return Ok(self.superseded(run));
        }

        let mut ready = self.ready.clone();
        let seen = ready.count();

        let frame = self.frame.reset().await?;
        self.set_ready_mark(frame, seen);
        if self.overtaken(run) {
            return Ok(self.superseded(run));
        }

        if !ready.wait_for_frame(frame, seen, self.options.settle_delay).await {
            debug!("{} sent no ready handshake, delivering anyway", frame);
        }
        if self.overtaken(run) {
            return Ok(self.superseded(run));
        }

        let js = decorate(
            &compiled.compiled_script,
            &DecorateOptions {
                modules_base_url: compiled.module_base_url.as_deref(),
                reload: false,
                flutter: self.options.flutter,
                generation: self.options.generation,
            },
        );
        Ok(self.post(ReloadMode::Full, HostCommand::Execute { js }))
    }

    async fn deliver_incremental(
        &self,
        run: u64,
        compiled: &CompileResult,
    ) -> Result<RunOutcome> {
        if self.overtaken(run) {
            return Ok(self.superseded(run));
        }

        // Only wait when the live frame has not reported ready yet
        if let Some((frame, mark)) = self.ready_mark() {
            let mut ready = self.ready.clone();
            if !ready.state().reported(frame, mark) {
                ready.wait_for_frame(frame, mark, self.options.settle_delay).await;
                if self.overtaken(run) {
                    return Ok(self.superseded(run));
                }
            }
        }

        let js = decorate(
            &compiled.compiled_script,
            &DecorateOptions {
                modules_base_url: compiled.module_base_url.as_deref(),
                reload: true,
                flutter: self.options.flutter,
                generation: self.options.generation,
            },
        );
        Ok(self.post(ReloadMode::Incremental, HostCommand::ExecuteReload { js }))
    }

    fn post(&self, mode: ReloadMode, command: HostCommand) -> RunOutcome {
        let name = command.name();
        let frame = self.frame.current_frame().map(|element| element.id);
        let posted = self.frame.post_to_frame(command);
        if !posted {
            debug!("{} not delivered: no frame attached", name);
        }
        RunOutcome::Delivered {
            mode,
            frame,
            command: name,
            posted,
        }
    }

    fn ready_mark(&self) -> Option<(FrameId, u64)> {
        *self.ready_mark.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_ready_mark(&self, frame: FrameId, seen: u64) {
        *self.ready_mark.lock().unwrap_or_else(|e| e.into_inner()) = Some((frame, seen));
    }

    /// A later full run has compiled and is waiting to replace the frame
    fn overtaken(&self, run: u64) -> bool {
        self.latest_full.load(Ordering::SeqCst) > run
    }

    fn superseded(&self, run: u64) -> RunOutcome {
        debug!("Run {} overtaken by a newer full run, not delivering", run);
        RunOutcome::Superseded
    }

    /// Phase changes from runs that have since been overtaken are ignored
    fn set_phase(&self, run: u64, phase: ReloadPhase) {
        if self.runs.load(Ordering::SeqCst) == run {
            self.phase_tx.send_replace(phase);
        }
    }

    fn finish(&self, run: u64) {
        self.set_phase(run, ReloadPhase::Idle);
    }
}
