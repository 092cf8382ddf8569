use std::sync::Once;

use pretty_assertions::assert_eq;
use typer_core::{
    compare, update, AbortReason, Effect, FallbackPolicy, InsertionAttemptResult,
    InsertionMethod, Msg, RunPhase, RunState,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(typer_logging::initialize_for_tests);
}

fn begin(total: usize, policy: FallbackPolicy, offset: usize) -> (RunState, Vec<Effect>) {
    update(RunState::new(total, policy, true), Msg::Begin { offset })
}

#[test]
fn clipboard_is_attempted_first_by_default() {
    init_logging();
    let (state, effects) = begin(20, FallbackPolicy::default(), 0);

    assert_eq!(
        state.phase(),
        RunPhase::Inserting {
            method: InsertionMethod::Clipboard
        }
    );
    assert_eq!(
        effects,
        vec![Effect::Attempt {
            method: InsertionMethod::Clipboard,
            offset: 0,
        }]
    );
}

#[test]
fn no_clipboard_starts_with_character_typing() {
    init_logging();
    let policy = FallbackPolicy {
        clipboard_enabled: false,
        prefer_batch: false,
    };
    let (_state, effects) = begin(20, policy, 0);
    assert_eq!(
        effects,
        vec![Effect::Attempt {
            method: InsertionMethod::CharByChar,
            offset: 0,
        }]
    );
}

#[test]
fn clipboard_failure_falls_back_to_batch_when_requested() {
    init_logging();
    let policy = FallbackPolicy {
        clipboard_enabled: true,
        prefer_batch: true,
    };
    let (state, _) = begin(20, policy, 4);
    let (state, effects) = update(
        state,
        Msg::AttemptFinished(InsertionAttemptResult::failed(
            InsertionMethod::Clipboard,
            0,
            "clipboard unavailable",
        )),
    );

    assert_eq!(
        effects,
        vec![Effect::Attempt {
            method: InsertionMethod::Batch,
            offset: 4,
        }]
    );
    assert_eq!(state.attempts().len(), 1);
}

#[test]
fn commits_checkpoint_and_report_progress() {
    init_logging();
    let policy = FallbackPolicy {
        clipboard_enabled: false,
        prefer_batch: true,
    };
    let (state, _) = begin(12, policy, 0);
    let (state, effects) = update(state, Msg::Committed { offset: 5 });

    assert_eq!(state.offset(), 5);
    assert_eq!(
        effects,
        vec![
            Effect::Checkpoint {
                offset: 5,
                method: Some(InsertionMethod::Batch),
            },
            Effect::ReportProgress { offset: 5 },
        ]
    );
}

#[test]
fn committed_offset_never_moves_backwards_or_past_the_end() {
    init_logging();
    let (state, _) = begin(10, FallbackPolicy::default(), 0);
    let (state, _) = update(state, Msg::Committed { offset: 6 });
    let (state, effects) = update(state, Msg::Committed { offset: 3 });
    assert_eq!(state.offset(), 6);
    assert!(effects.is_empty());

    let (state, _) = update(state, Msg::Committed { offset: 99 });
    assert_eq!(state.offset(), 10);
}

#[test]
fn exhausted_content_moves_to_verification() {
    init_logging();
    let policy = FallbackPolicy {
        clipboard_enabled: false,
        prefer_batch: true,
    };
    let (state, _) = begin(12, policy, 0);
    let (state, _) = update(state, Msg::Committed { offset: 5 });
    let (state, _) = update(state, Msg::Committed { offset: 10 });
    let (state, _) = update(state, Msg::Committed { offset: 12 });
    let (state, effects) = update(
        state,
        Msg::AttemptFinished(InsertionAttemptResult::completed(
            InsertionMethod::Batch,
            12,
        )),
    );

    assert_eq!(state.phase(), RunPhase::Verifying);
    assert_eq!(
        effects,
        vec![
            Effect::Checkpoint {
                offset: 12,
                method: Some(InsertionMethod::Batch),
            },
            Effect::Verify,
        ]
    );

    let (state, effects) = update(
        state,
        Msg::VerificationFinished(compare("Hello\n\tWorld", "Hello\n\tWorld")),
    );
    assert_eq!(state.phase(), RunPhase::Completed);
    assert_eq!(effects, vec![Effect::Finish]);
    assert!(state.view().verification.unwrap().is_match());
}

#[test]
fn partial_batch_failure_keeps_progress_and_aborts_when_exhausted() {
    init_logging();
    let policy = FallbackPolicy {
        clipboard_enabled: false,
        prefer_batch: true,
    };
    let (state, _) = begin(20, policy, 0);
    let (state, _) = update(state, Msg::Committed { offset: 5 });
    let (state, effects) = update(
        state,
        Msg::AttemptFinished(InsertionAttemptResult::failed(
            InsertionMethod::Batch,
            5,
            "stale element",
        )),
    );

    assert_eq!(state.phase(), RunPhase::Failed);
    assert_eq!(state.offset(), 5);
    assert_eq!(
        effects,
        vec![
            Effect::Checkpoint {
                offset: 5,
                method: Some(InsertionMethod::Batch),
            },
            Effect::Abort {
                reason: AbortReason::StrategiesExhausted { offset: 5 },
            },
        ]
    );
}

#[test]
fn clean_early_return_reattempts_same_method_on_the_rest() {
    init_logging();
    let policy = FallbackPolicy {
        clipboard_enabled: false,
        prefer_batch: false,
    };
    let (state, _) = begin(10, policy, 0);
    let (_state, effects) = update(
        state,
        Msg::AttemptFinished(InsertionAttemptResult::completed(
            InsertionMethod::CharByChar,
            4,
        )),
    );

    assert_eq!(
        effects,
        vec![
            Effect::Checkpoint {
                offset: 4,
                method: Some(InsertionMethod::CharByChar),
            },
            Effect::ReportProgress { offset: 4 },
            Effect::Attempt {
                method: InsertionMethod::CharByChar,
                offset: 4,
            },
        ]
    );
}

#[test]
fn success_without_progress_counts_as_failure() {
    init_logging();
    let (state, _) = begin(10, FallbackPolicy::default(), 0);
    let (state, effects) = update(
        state,
        Msg::AttemptFinished(InsertionAttemptResult::completed(
            InsertionMethod::Clipboard,
            0,
        )),
    );
    assert_eq!(
        effects,
        vec![Effect::Attempt {
            method: InsertionMethod::CharByChar,
            offset: 0,
        }]
    );
    assert_eq!(
        state.phase(),
        RunPhase::Inserting {
            method: InsertionMethod::CharByChar
        }
    );
}

#[test]
fn interrupt_checkpoints_last_confirmed_offset() {
    init_logging();
    let (state, _) = begin(20, FallbackPolicy::default(), 0);
    let (state, _) = update(
        state,
        Msg::AttemptFinished(InsertionAttemptResult::failed(
            InsertionMethod::Clipboard,
            0,
            "paste produced no change",
        )),
    );
    let (state, _) = update(state, Msg::Committed { offset: 7 });
    let (state, effects) = update(state, Msg::Interrupted);

    assert_eq!(state.phase(), RunPhase::Interrupted);
    assert_eq!(
        effects,
        vec![
            Effect::Checkpoint {
                offset: 7,
                method: Some(InsertionMethod::CharByChar),
            },
            Effect::Stop,
        ]
    );

    // Terminal phases ignore further input.
    let (state, effects) = update(state, Msg::Committed { offset: 9 });
    assert_eq!(state.offset(), 7);
    assert!(effects.is_empty());
}

#[test]
fn resuming_at_the_end_goes_straight_to_verification() {
    init_logging();
    let (state, effects) = begin(12, FallbackPolicy::default(), 12);
    assert_eq!(state.phase(), RunPhase::Verifying);
    assert_eq!(effects, vec![Effect::Verify]);
}

#[test]
fn disabled_verification_finishes_immediately() {
    init_logging();
    let state = RunState::new(3, FallbackPolicy::default(), false);
    let (state, _) = update(state, Msg::Begin { offset: 0 });
    let (state, effects) = update(
        state,
        Msg::AttemptFinished(InsertionAttemptResult::completed(
            InsertionMethod::Clipboard,
            3,
        )),
    );

    assert_eq!(state.phase(), RunPhase::Completed);
    assert_eq!(effects.last(), Some(&Effect::Finish));
    assert_eq!(state.view().verification, None);
    assert_eq!(state.view().committed_this_run(), 3);
}

#[test]
fn unavailable_verification_still_completes() {
    init_logging();
    let (state, _) = begin(0, FallbackPolicy::default(), 0);
    let (state, effects) = update(
        state,
        Msg::VerificationUnavailable {
            detail: "stale element".to_string(),
        },
    );
    assert_eq!(state.phase(), RunPhase::Completed);
    assert_eq!(effects, vec![Effect::Finish]);
}

#[test]
fn messages_after_completion_change_nothing() {
    init_logging();
    let (state, _) = begin(0, FallbackPolicy::default(), 0);
    let (done, _) = update(
        state,
        Msg::VerificationUnavailable {
            detail: "stale element".to_string(),
        },
    );

    for late in [
        Msg::Begin { offset: 0 },
        Msg::Committed { offset: 5 },
        Msg::AttemptFinished(InsertionAttemptResult::completed(InsertionMethod::Batch, 5)),
        Msg::Interrupted,
    ] {
        let (next, effects) = update(done.clone(), late);
        assert_eq!(next, done);
        assert!(effects.is_empty());
    }
}
