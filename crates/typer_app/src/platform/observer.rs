use std::io::{self, Write};
use std::time::{Duration, Instant};

use typer_core::{InsertionAttemptResult, InsertionMethod, ProgressReport};
use typer_engine::{RunObserver, SessionError, INTERRUPTED};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Prints attempts and a single self-overwriting progress line.
pub struct ConsoleObserver {
    last_progress: Option<Instant>,
    line_open: bool,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        Self {
            last_progress: None,
            line_open: false,
        }
    }

    fn close_line(&mut self) {
        if self.line_open {
            println!();
            self.line_open = false;
        }
    }
}

impl RunObserver for ConsoleObserver {
    fn attempt_started(&mut self, method: InsertionMethod, offset: usize) {
        self.close_line();
        match method {
            InsertionMethod::Clipboard => println!("Pasting from character {offset} via the clipboard..."),
            InsertionMethod::Batch => println!("Typing in batches from character {offset}..."),
            InsertionMethod::CharByChar => println!("Typing character by character from {offset}..."),
        }
    }

    fn attempt_finished(&mut self, result: &InsertionAttemptResult) {
        self.close_line();
        if result.success {
            return;
        }
        match result.error.as_deref() {
            Some(INTERRUPTED) => println!("Interrupted after {} characters", result.committed),
            Some(detail) => println!("{} insertion failed: {detail}", result.method),
            None => println!("{} insertion failed", result.method),
        }
    }

    fn progress(&mut self, report: &ProgressReport) {
        let now = Instant::now();
        let finished = report.offset >= report.total;
        let due = self
            .last_progress
            .is_none_or(|last| now.duration_since(last) >= PROGRESS_INTERVAL);
        if !due && !finished {
            return;
        }
        self.last_progress = Some(now);
        print!("\r{report}    ");
        let _ = io::stdout().flush();
        self.line_open = true;
        if finished {
            self.close_line();
        }
    }

    fn checkpoint_failed(&mut self, error: &SessionError) {
        self.close_line();
        eprintln!("Warning: failed to save progress: {error}");
    }
}
