//! Drives a run: feeds messages to the core state machine and executes the
//! effects it returns against the editor, the session store and the observer.

use std::collections::VecDeque;
use std::time::Instant;

use typer_core::{
    update, AbortReason, Effect, FallbackPolicy, InsertionAttemptResult, InsertionMethod, Msg,
    ProgressReport, ProgressTracker, RunPhase, RunState, RunView,
};
use typer_logging::{typer_debug, typer_error, typer_info, typer_warn};

use crate::clipboard::Clipboard;
use crate::content::ContentPayload;
use crate::editor::{EditorDriver, EditorHandle};
use crate::session_store::{Checkpointer, SessionError};
use crate::strategy::{CancelFlag, CommitSink, InsertionStrategy, StrategyContext, StrategySettings};
use crate::verify::{expected_text, verify_editor};

/// Hooks for operator-facing output. Every method defaults to doing nothing.
pub trait RunObserver {
    fn attempt_started(&mut self, _method: InsertionMethod, _offset: usize) {}
    fn attempt_finished(&mut self, _result: &InsertionAttemptResult) {}
    fn progress(&mut self, _report: &ProgressReport) {}
    fn checkpoint_failed(&mut self, _error: &SessionError) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl RunObserver for NullObserver {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub policy: FallbackPolicy,
    pub strategies: StrategySettings,
    pub verify: bool,
    pub formatted: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            policy: FallbackPolicy::default(),
            strategies: StrategySettings::default(),
            verify: true,
            formatted: false,
        }
    }
}

pub struct RunContext<'a> {
    pub driver: &'a mut dyn EditorDriver,
    pub clipboard: &'a mut dyn Clipboard,
    pub handle: &'a EditorHandle,
    pub cancel: &'a CancelFlag,
    pub checkpointer: &'a mut dyn Checkpointer,
    pub observer: &'a mut dyn RunObserver,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(RunView),
    Interrupted(RunView),
    Failed { view: RunView, reason: AbortReason },
}

impl RunOutcome {
    pub fn view(&self) -> &RunView {
        match self {
            RunOutcome::Completed(view) | RunOutcome::Interrupted(view) => view,
            RunOutcome::Failed { view, .. } => view,
        }
    }
}

/// Insert `payload` from `start_offset` to the end, falling back between
/// methods as the policy allows. A run from offset 0 starts by clearing the
/// editor; a resumed run keeps what earlier runs typed.
pub fn run_insertion(
    payload: &ContentPayload,
    start_offset: usize,
    settings: &RunSettings,
    ctx: RunContext<'_>,
) -> RunOutcome {
    let RunContext {
        driver,
        clipboard,
        handle,
        cancel,
        checkpointer,
        observer,
    } = ctx;

    if start_offset == 0 {
        match driver.clear_content(handle) {
            Ok(()) => typer_debug!("Cleared {handle} before a fresh run"),
            Err(err) => typer_warn!("Could not clear {handle} before a fresh run: {err}"),
        }
    }

    let mut state = RunState::new(payload.len(), settings.policy, settings.verify);
    let mut reporter = Reporter {
        checkpointer,
        observer,
        tracker: ProgressTracker::new(start_offset, payload.len()),
        started: Instant::now(),
    };
    let mut strategy_ctx = StrategyContext {
        driver,
        clipboard,
        handle,
        cancel,
    };
    let mut inbox = VecDeque::from([Msg::Begin {
        offset: start_offset,
    }]);
    let mut abort_reason = None;

    while let Some(msg) = inbox.pop_front() {
        let (next, effects) = update(std::mem::take(&mut state), msg);
        state = next;
        for effect in effects {
            match effect {
                Effect::Attempt { method, offset } => {
                    if cancel.is_cancelled() {
                        inbox.push_back(Msg::Interrupted);
                        continue;
                    }
                    let strategy = InsertionStrategy::for_method(method, &settings.strategies);
                    reporter.observer.attempt_started(method, offset);
                    let result = {
                        let mut relay = CommitRelay {
                            state: &mut state,
                            reporter: &mut reporter,
                        };
                        strategy.run(&mut strategy_ctx, payload.suffix(offset), offset, &mut relay)
                    };
                    reporter.observer.attempt_finished(&result);
                    if cancel.is_cancelled() {
                        inbox.push_back(Msg::Committed {
                            offset: offset + result.committed,
                        });
                        inbox.push_back(Msg::Interrupted);
                    } else {
                        inbox.push_back(Msg::AttemptFinished(result));
                    }
                }
                Effect::Verify => {
                    let expected = expected_text(payload.text(), settings.formatted);
                    match verify_editor(strategy_ctx.driver, handle, &expected) {
                        Ok(result) => inbox.push_back(Msg::VerificationFinished(result)),
                        Err(err) => {
                            typer_warn!("Verification skipped: {err}");
                            inbox.push_back(Msg::VerificationUnavailable {
                                detail: err.to_string(),
                            });
                        }
                    }
                }
                Effect::Abort { reason } => {
                    typer_error!("Insertion aborted: {reason:?}");
                    abort_reason = Some(reason);
                }
                Effect::Stop => typer_info!("Run interrupted at offset {}", state.offset()),
                Effect::Finish => typer_info!("Run finished at offset {}", state.offset()),
                other => reporter.apply(other),
            }
        }
    }

    let view = state.view();
    match (view.phase, abort_reason) {
        (RunPhase::Completed, _) => RunOutcome::Completed(view),
        (RunPhase::Interrupted, _) => RunOutcome::Interrupted(view),
        (_, Some(reason)) => RunOutcome::Failed { view, reason },
        (phase, None) => {
            typer_warn!("Run stopped in unexpected phase {phase:?}");
            RunOutcome::Failed {
                view,
                reason: AbortReason::NoStrategies,
            }
        }
    }
}

/// Applies checkpoint and progress effects.
struct Reporter<'a> {
    checkpointer: &'a mut dyn Checkpointer,
    observer: &'a mut dyn RunObserver,
    tracker: ProgressTracker,
    started: Instant,
}

impl Reporter<'_> {
    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Checkpoint { offset, method } => {
                if let Err(err) = self.checkpointer.checkpoint(offset, method) {
                    typer_warn!("Checkpoint at offset {offset} failed: {err}");
                    self.observer.checkpoint_failed(&err);
                }
            }
            Effect::ReportProgress { offset } => {
                let report = self.tracker.observe(offset, self.started.elapsed());
                self.observer.progress(&report);
            }
            other => typer_debug!("Effect {other:?} ignored during an attempt"),
        }
    }
}

/// Feeds strategy commits straight into the state machine while the
/// strategy still holds the editor.
struct CommitRelay<'r, 'a> {
    state: &'r mut RunState,
    reporter: &'r mut Reporter<'a>,
}

impl CommitSink for CommitRelay<'_, '_> {
    fn committed(&mut self, offset: usize) {
        let (next, effects) = update(std::mem::take(self.state), Msg::Committed { offset });
        *self.state = next;
        for effect in effects {
            self.reporter.apply(effect);
        }
    }
}
