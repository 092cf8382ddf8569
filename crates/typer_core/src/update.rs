use crate::{AbortReason, Effect, Msg, RunPhase, RunState};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: RunState, msg: Msg) -> (RunState, Vec<Effect>) {
    let effects = match msg {
        Msg::Begin { offset } => {
            if state.phase() != RunPhase::Idle {
                return (state, Vec::new());
            }
            state.begin(offset);
            if state.is_exhausted() {
                finish_inserting(&mut state)
            } else {
                attempt_next(&mut state)
            }
        }
        Msg::Committed { offset } => {
            let RunPhase::Inserting { method } = state.phase() else {
                return (state, Vec::new());
            };
            if state.advance(offset, method) {
                progress_effects(&state)
            } else {
                Vec::new()
            }
        }
        Msg::AttemptFinished(result) => {
            let RunPhase::Inserting { method } = state.phase() else {
                return (state, Vec::new());
            };
            let reached = state.attempt_start() + result.committed;
            let mut effects = if state.advance(reached, method) {
                progress_effects(&state)
            } else {
                Vec::new()
            };
            let made_progress = state.offset() > state.attempt_start();
            let succeeded = result.success;
            state.record_attempt(result);

            if state.is_exhausted() {
                if effects.is_empty() {
                    effects.push(checkpoint(&state));
                }
                effects.extend(finish_inserting(&mut state));
            } else if succeeded && made_progress {
                // Strategy stopped early but cleanly; hand it the rest.
                state.start_attempt(method);
                effects.push(Effect::Attempt {
                    method,
                    offset: state.offset(),
                });
            } else {
                effects.extend(attempt_next(&mut state));
            }
            effects
        }
        Msg::VerificationFinished(result) => {
            if state.phase() != RunPhase::Verifying {
                return (state, Vec::new());
            }
            state.set_verification(result);
            state.set_phase(RunPhase::Completed);
            vec![Effect::Finish]
        }
        Msg::VerificationUnavailable { .. } => {
            if state.phase() != RunPhase::Verifying {
                return (state, Vec::new());
            }
            state.set_phase(RunPhase::Completed);
            vec![Effect::Finish]
        }
        Msg::Interrupted => {
            if state.phase().is_terminal() {
                return (state, Vec::new());
            }
            state.set_phase(RunPhase::Interrupted);
            vec![checkpoint(&state), Effect::Stop]
        }
    };

    (state, effects)
}

fn attempt_next(state: &mut RunState) -> Vec<Effect> {
    match state.next_method() {
        Some(method) => {
            state.start_attempt(method);
            vec![Effect::Attempt {
                method,
                offset: state.offset(),
            }]
        }
        None => {
            let had_attempts = !state.attempts().is_empty();
            state.set_phase(RunPhase::Failed);
            let reason = if had_attempts {
                AbortReason::StrategiesExhausted {
                    offset: state.offset(),
                }
            } else {
                AbortReason::NoStrategies
            };
            vec![checkpoint(state), Effect::Abort { reason }]
        }
    }
}

fn finish_inserting(state: &mut RunState) -> Vec<Effect> {
    if state.wants_verification() {
        state.set_phase(RunPhase::Verifying);
        vec![Effect::Verify]
    } else {
        state.set_phase(RunPhase::Completed);
        vec![Effect::Finish]
    }
}

fn checkpoint(state: &RunState) -> Effect {
    Effect::Checkpoint {
        offset: state.offset(),
        method: state.method_used(),
    }
}

fn progress_effects(state: &RunState) -> Vec<Effect> {
    vec![
        checkpoint(state),
        Effect::ReportProgress {
            offset: state.offset(),
        },
    ]
}
