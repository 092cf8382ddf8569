mod common;

use std::num::NonZeroUsize;
use std::time::Duration;

use common::{handle, init_logging, FakeClipboard, FakeEditor};
use pretty_assertions::assert_eq;
use typer_core::InsertionMethod;
use typer_engine::{
    CancelFlag, InsertionStrategy, StrategyConfigError, StrategyContext, StrategySettings,
    INTERRUPTED,
};

fn batch(size: usize) -> InsertionStrategy {
    InsertionStrategy::Batch {
        chunk_size: NonZeroUsize::new(size).unwrap(),
        delay: Duration::ZERO,
    }
}

fn run(
    strategy: &InsertionStrategy,
    editor: &mut FakeEditor,
    clipboard: &mut FakeClipboard,
    cancel: &CancelFlag,
    suffix: &str,
    offset: usize,
) -> (typer_core::InsertionAttemptResult, Vec<usize>) {
    let handle = handle();
    let mut ctx = StrategyContext {
        driver: editor,
        clipboard,
        handle: &handle,
        cancel,
    };
    let mut commits = Vec::new();
    let result = strategy.run(&mut ctx, suffix, offset, &mut commits);
    (result, commits)
}

#[test]
fn batch_keeps_tabs_and_newlines_intact() {
    init_logging();
    let mut editor = FakeEditor::new();
    let mut clipboard = FakeClipboard::holding("");
    let cancel = CancelFlag::new();

    let (result, commits) = run(&batch(5), &mut editor, &mut clipboard, &cancel, "Hello\n\tWorld", 0);

    assert_eq!(editor.fragments, vec!["Hello", "\n\tWor", "ld"]);
    assert_eq!(commits, vec![5, 10, 12]);
    assert!(result.success);
    assert_eq!(result.committed, 12);
    assert_eq!(result.method, InsertionMethod::Batch);
    assert_eq!(editor.content, "Hello\n\tWorld");
}

#[test]
fn batch_failure_counts_only_confirmed_chunks() {
    init_logging();
    let mut editor = FakeEditor::new();
    editor.fail_after = Some(1);
    let mut clipboard = FakeClipboard::holding("");
    let cancel = CancelFlag::new();

    let (result, commits) = run(&batch(5), &mut editor, &mut clipboard, &cancel, "Hello\n\tWorld", 0);

    assert!(!result.success);
    assert_eq!(result.committed, 5);
    assert_eq!(commits, vec![5]);
    assert!(result.error.unwrap().contains("timed out"));
}

#[test]
fn commits_are_absolute_offsets() {
    init_logging();
    let mut editor = FakeEditor::new();
    let mut clipboard = FakeClipboard::holding("");
    let cancel = CancelFlag::new();

    let (_, commits) = run(&batch(4), &mut editor, &mut clipboard, &cancel, "abcdefgh", 7);

    assert_eq!(commits, vec![11, 15]);
}

#[test]
fn char_by_char_sends_one_character_at_a_time() {
    init_logging();
    let mut editor = FakeEditor::new();
    let mut clipboard = FakeClipboard::holding("");
    let cancel = CancelFlag::new();
    let strategy = InsertionStrategy::CharByChar {
        delay: Duration::ZERO,
    };

    let (result, commits) = run(&strategy, &mut editor, &mut clipboard, &cancel, "a é\n", 0);

    assert_eq!(editor.fragments, vec!["a", " ", "é", "\n"]);
    assert_eq!(commits, vec![1, 2, 3, 4]);
    assert_eq!(result.committed, 4);
    assert!(result.success);
}

#[test]
fn clipboard_pastes_whole_suffix_and_restores_clipboard() {
    init_logging();
    let mut clipboard = FakeClipboard::holding("operator data");
    let mut editor = FakeEditor::with_content("Intro ");
    editor.clipboard = Some(clipboard.shared());
    let cancel = CancelFlag::new();

    let (result, commits) = run(
        &InsertionStrategy::Clipboard,
        &mut editor,
        &mut clipboard,
        &cancel,
        "rest of text",
        6,
    );

    assert!(result.success);
    assert_eq!(result.committed, 12);
    assert_eq!(commits, vec![18]);
    assert_eq!(editor.content, "Intro rest of text");
    assert_eq!(*clipboard.text.borrow(), "operator data");
    assert_eq!(clipboard.writes, vec!["rest of text", "operator data"]);
}

#[test]
fn clipboard_without_visible_change_commits_nothing() {
    init_logging();
    let mut clipboard = FakeClipboard::holding("saved");
    let mut editor = FakeEditor::with_content("unchanged");
    let cancel = CancelFlag::new();

    let (result, commits) = run(
        &InsertionStrategy::Clipboard,
        &mut editor,
        &mut clipboard,
        &cancel,
        "text",
        0,
    );

    assert!(!result.success);
    assert_eq!(result.committed, 0);
    assert!(commits.is_empty());
    assert_eq!(*clipboard.text.borrow(), "saved");
}

#[test]
fn clipboard_restored_when_paste_fails() {
    init_logging();
    let mut clipboard = FakeClipboard::holding("saved");
    let mut editor = FakeEditor::new();
    editor.fail_paste = true;
    let cancel = CancelFlag::new();

    let (result, _) = run(
        &InsertionStrategy::Clipboard,
        &mut editor,
        &mut clipboard,
        &cancel,
        "text",
        0,
    );

    assert!(!result.success);
    assert!(result.error.unwrap().contains("paste rejected"));
    assert_eq!(*clipboard.text.borrow(), "saved");
}

#[test]
fn unavailable_clipboard_fails_attempt() {
    init_logging();
    let mut clipboard = FakeClipboard::unavailable();
    let mut editor = FakeEditor::new();
    let cancel = CancelFlag::new();

    let (result, _) = run(
        &InsertionStrategy::Clipboard,
        &mut editor,
        &mut clipboard,
        &cancel,
        "text",
        0,
    );

    assert!(!result.success);
    assert_eq!(result.committed, 0);
    assert!(result.error.unwrap().contains("clipboard unavailable"));
}

#[test]
fn unreadable_clipboard_is_left_untouched() {
    init_logging();
    let mut clipboard = FakeClipboard::holding("operator data");
    clipboard.unreadable = true;
    let mut editor = FakeEditor::new();
    editor.clipboard = Some(clipboard.shared());
    let cancel = CancelFlag::new();

    let (result, commits) = run(
        &InsertionStrategy::Clipboard,
        &mut editor,
        &mut clipboard,
        &cancel,
        "text",
        0,
    );

    assert!(!result.success);
    assert!(commits.is_empty());
    assert!(clipboard.writes.is_empty());
    assert_eq!(*clipboard.text.borrow(), "operator data");
    assert_eq!(editor.content, "");
}

#[test]
fn cancellation_stops_between_steps() {
    init_logging();
    let cancel = CancelFlag::new();
    let mut editor = FakeEditor::new();
    editor.cancel_after = Some((2, cancel.clone()));
    let mut clipboard = FakeClipboard::holding("");

    let (result, commits) = run(&batch(3), &mut editor, &mut clipboard, &cancel, "abcdefghij", 0);

    assert_eq!(result.committed, 6);
    assert_eq!(commits, vec![3, 6]);
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some(INTERRUPTED));
}

#[test]
fn zero_batch_size_is_rejected() {
    assert_eq!(
        StrategySettings::from_operator(0, 0.1, 0.01),
        Err(StrategyConfigError::ZeroBatchSize)
    );
    assert_eq!(
        StrategySettings::from_operator(5, -1.0, 0.01),
        Err(StrategyConfigError::InvalidDelay("batch"))
    );
    let settings = StrategySettings::from_operator(5, 0.0, 0.0).unwrap();
    assert_eq!(settings.batch_size.get(), 5);
}

#[test]
fn default_settings_match_documented_values() {
    let settings = StrategySettings::default();
    assert_eq!(settings.batch_size.get(), 50);
    assert_eq!(settings.batch_delay, Duration::from_millis(100));
    assert_eq!(settings.type_delay, Duration::from_millis(10));
    assert_eq!(
        InsertionStrategy::for_method(InsertionMethod::Batch, &settings).method(),
        InsertionMethod::Batch
    );
}
