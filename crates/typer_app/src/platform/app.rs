use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use chrono::Utc;
use typer_core::{normalize_target_url, AbortReason, SessionKey, Verdict, VerificationResult};
use typer_engine::webdriver::WebDriverEditor;
use typer_engine::{
    load_content, looks_like_html, run_insertion, CancelFlag, Checkpointer, Clipboard, Clock,
    ContentPayload, DriverError, EditorCandidate, EditorDriver, EditorHandle, FileRecordStore,
    NoCheckpoint, NoClipboard, RunContext, RunOutcome, SessionStore, SourcePosition,
    SystemClipboard,
};
use typer_logging::{typer_error, typer_info, typer_warn};

use super::logging;
use super::observer::ConsoleObserver;
use super::prompt::{Prompter, TerminalPrompter};
use super::session::{prepare_session, SessionSetup};
use crate::cli::Cli;
use crate::config::{FileConfig, Settings};

/// How a run ended, as seen by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Everything was inserted. Verification mismatches are only reported.
    Completed,
    /// Ctrl-C after the checkpoint.
    Interrupted,
}

impl RunStatus {
    pub fn exit_code(self) -> u8 {
        match self {
            RunStatus::Completed => 0,
            RunStatus::Interrupted => 130,
        }
    }
}

pub const EXIT_FATAL: u8 = 1;

pub fn run(cli: Cli) -> ExitCode {
    logging::initialize(cli.verbose);
    match run_typer(&cli) {
        Ok(status) => ExitCode::from(status.exit_code()),
        Err(err) => {
            typer_error!("{err:#}");
            eprintln!("Error: {err:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn run_typer(cli: &Cli) -> anyhow::Result<RunStatus> {
    let file_config = FileConfig::load(cli.config.as_deref())?;
    let mut settings = Settings::resolve(cli, &file_config)?;
    let mut prompter = TerminalPrompter::new(settings.assume_yes);

    let payload = load_content(&settings.files, &settings.separator)?;
    println!(
        "Loaded {} characters from {} file(s)",
        payload.len(),
        payload.sources().len()
    );
    for source in payload.sources() {
        typer_info!(
            "Input {} decoded as {} ({} chars at offset {})",
            source.path.display(),
            source.encoding_label,
            source.len,
            source.start
        );
    }
    apply_formatting_mode(&mut settings, &payload);

    let key = SessionKey::new(&settings.url, payload.fingerprint());
    let browser = settings.editor.browser.clone();
    let mut editor = WebDriverEditor::connect(settings.editor.clone()).map_err(|err| {
        if browser.use_existing {
            anyhow!("cannot attach to the running {}: {err} ({})", browser.browser, browser.attach_hint())
        } else {
            anyhow!("cannot start {} through {}: {err}", browser.browser, settings.editor.client.base_url)
        }
    })?;

    open_page(&mut editor, &settings, &key, &mut prompter)?;

    let clock: Clock = Arc::new(|| Utc::now().to_rfc3339());
    let store = SessionStore::new(FileRecordStore::new(settings.session.dir.clone()));
    let mut plan = prepare_session(
        store,
        SessionSetup {
            key: &key,
            files: payload.source_names(),
            total_len: payload.len(),
            options: &settings.session,
            clock,
        },
        &mut prompter,
    )?;

    prompter.pause("\nPress Enter when the page is fully loaded and you're ready to start typing...");

    let handle = select_editor(&mut editor, &settings, &mut prompter)?;
    println!("Using {handle} editor");

    let cancel = CancelFlag::new();
    let interrupt = editor.install_interrupt_handler(cancel.clone());

    let mut clipboard: Box<dyn Clipboard> = if settings.run.policy.clipboard_enabled {
        Box::new(SystemClipboard::detect())
    } else {
        Box::new(NoClipboard)
    };
    let start = plan.start_offset();
    let mut no_checkpoint = NoCheckpoint;
    let checkpointer: &mut dyn Checkpointer = match plan.writer.as_mut() {
        Some(writer) => writer,
        None => &mut no_checkpoint,
    };
    let mut observer = ConsoleObserver::new();

    if start > 0 {
        println!("Resuming from character {start} of {}", payload.len());
    }
    let outcome = run_insertion(
        &payload,
        start,
        &settings.run,
        RunContext {
            driver: &mut editor,
            clipboard: clipboard.as_mut(),
            handle: &handle,
            cancel: &cancel,
            checkpointer,
            observer: &mut observer,
        },
    );
    drop(interrupt);

    let status = finish(&outcome, &payload, &settings)?;
    if status == RunStatus::Completed {
        release_browser(&mut editor, &settings, &mut prompter);
    }
    Ok(status)
}

/// HTML is only inserted as markup when it looks like markup. The clipboard
/// carries plain text, so formatted runs skip it.
fn apply_formatting_mode(settings: &mut Settings, payload: &ContentPayload) {
    if !settings.run.formatted {
        return;
    }
    if looks_like_html(payload.text()) {
        settings.run.policy.clipboard_enabled = false;
        typer_info!("Formatted mode: inserting HTML, clipboard disabled");
    } else {
        println!("Input does not look like HTML; typing it as plain text");
        settings.run.formatted = false;
    }
    settings.editor.formatted = settings.run.formatted;
}

fn open_page(
    editor: &mut WebDriverEditor,
    settings: &Settings,
    key: &SessionKey,
    prompter: &mut dyn Prompter,
) -> anyhow::Result<()> {
    if !settings.editor.browser.use_existing || settings.force_navigation {
        println!("Loading page: {}", settings.url);
        editor
            .navigate(&settings.url)
            .with_context(|| format!("cannot load {}", settings.url))?;
        return Ok(());
    }

    let current = editor.current_url().context("cannot read the current page")?;
    println!("Using current page in existing browser session: {current}");
    if normalize_target_url(&current) != key.url {
        let question = format!(
            "Current page differs from {}. Navigate there?",
            settings.url
        );
        if prompter.confirm(&question) {
            editor
                .navigate(&settings.url)
                .with_context(|| format!("cannot load {}", settings.url))?;
        }
    }
    Ok(())
}

fn select_editor(
    editor: &mut WebDriverEditor,
    settings: &Settings,
    prompter: &mut dyn Prompter,
) -> anyhow::Result<EditorHandle> {
    let candidates = match editor.locate_editor(&settings.query) {
        Ok(candidates) => candidates,
        Err(DriverError::ElementNotFound) => {
            bail!("no editor found on the page (try --editor-id or --iframe-id)")
        }
        Err(err) => return Err(err).context("editor discovery failed"),
    };
    pick_candidate(candidates, prompter)
}

fn pick_candidate(
    mut candidates: Vec<EditorCandidate>,
    prompter: &mut dyn Prompter,
) -> anyhow::Result<EditorHandle> {
    if candidates.len() == 1 {
        return Ok(candidates.remove(0).handle);
    }
    let labels: Vec<String> = candidates
        .iter()
        .map(|candidate| format!("{} ({})", candidate.handle, candidate.source))
        .collect();
    let title = format!("Found {} editors. Please select:", candidates.len());
    match prompter.choose(&title, &labels) {
        Some(idx) if idx < candidates.len() => Ok(candidates.swap_remove(idx).handle),
        _ => bail!("no editor selected"),
    }
}

/// Print the outcome and map it to a status. Aborts become errors so they
/// leave through the fatal path.
fn finish(
    outcome: &RunOutcome,
    payload: &ContentPayload,
    settings: &Settings,
) -> anyhow::Result<RunStatus> {
    let view = outcome.view();
    match outcome {
        RunOutcome::Completed(_) => {
            if settings.run.verify {
                for line in verification_lines(view.verification.as_ref()) {
                    println!("{line}");
                }
            }
            let method = view
                .method_used
                .map(|method| method.to_string())
                .unwrap_or_else(|| "nothing left to insert".to_string());
            println!("\nTyping completed ({method}, {} characters this run)", view.committed_this_run());
            println!("You can now manually review and submit the form");
            Ok(RunStatus::Completed)
        }
        RunOutcome::Interrupted(_) => {
            println!(
                "\nInterrupted at character {} of {}{}.",
                view.offset,
                view.total_len,
                position_in_files(payload, view.offset)
            );
            if settings.session.enabled {
                println!("Progress saved; run the same command again to resume.");
            }
            Ok(RunStatus::Interrupted)
        }
        RunOutcome::Failed { reason, .. } => match reason {
            AbortReason::NoStrategies => bail!("no insertion method is enabled"),
            AbortReason::StrategiesExhausted { offset } => {
                let saved = if settings.session.enabled {
                    "; progress saved"
                } else {
                    ""
                };
                bail!(
                    "all insertion methods failed at character {offset} of {}{}{saved}",
                    view.total_len,
                    position_in_files(payload, *offset)
                )
            }
        },
    }
}

/// Where `offset` falls when the input spans several files, e.g.
/// ` (file 2, b.txt, character 3)`. Empty for single-file input.
pub fn position_in_files(payload: &ContentPayload, offset: usize) -> String {
    if payload.sources().len() < 2 {
        return String::new();
    }
    match payload.locate(offset) {
        SourcePosition::File { file, offset } => match payload.sources().get(file) {
            Some(source) => format!(
                " (file {}, {}, character {offset})",
                file + 1,
                source.path.display()
            ),
            None => String::new(),
        },
        SourcePosition::Separator { after_file, .. } => {
            format!(" (between file {} and file {})", after_file + 1, after_file + 2)
        }
        SourcePosition::End => String::new(),
    }
}

pub fn verification_lines(result: Option<&VerificationResult>) -> Vec<String> {
    let Some(result) = result else {
        return vec!["Verification skipped: the editor content could not be read back".to_string()];
    };
    if result.verdict == Verdict::Match {
        return vec![format!(
            "Verification passed: {} characters match",
            result.expected_len
        )];
    }
    let mut lines = vec![format!(
        "Warning: content verification reported {}: expected {} characters, editor holds {}",
        result.verdict.as_str(),
        result.expected_len,
        result.actual_len
    )];
    if let Some(divergence) = &result.divergence {
        lines.push(format!("  first difference at character {}", divergence.position));
        lines.push(format!("  expected: {:?}", divergence.expected_context));
        lines.push(format!("  actual:   {:?}", divergence.actual_context));
    }
    lines
}

fn release_browser(editor: &mut WebDriverEditor, settings: &Settings, prompter: &mut dyn Prompter) {
    if settings.editor.browser.use_existing {
        println!("Keeping the existing browser session open");
        return;
    }
    if settings.assume_yes {
        println!("The browser stays open for review");
        return;
    }
    if prompter.confirm("Close the browser now?") {
        if let Err(err) = editor.quit() {
            typer_warn!("Failed to close the browser session: {err}");
        }
    }
}
